//! # infra-forge-compiler
//!
//! Binding, forward compilation and decompilation for infra-forge programs.
//!
//! - [`bind`] resolves a parsed [`Program`](infra_forge_dsl::Program) into a
//!   [`SemanticModel`]: scopes, symbols, reference graph and diagnostics
//! - [`emit`] lowers a model into a target-format JSON document with
//!   resources ordered by their dependencies
//! - [`decompile`] rebuilds a syntax tree from a target-format document, and
//!   [`decompile_to_source`] prints it and binds the printed text again
//!
//! # Example
//!
//! ```
//! use infra_forge_compiler::{compile, emit};
//!
//! let model = compile(
//!     "parameter name: string\nvariable greeting = concat('hello ', name)\noutput result = greeting",
//! );
//! assert!(!model.has_errors());
//!
//! let emission = emit(&model).expect("emit failed");
//! assert_eq!(
//!     emission.document["variables"]["greeting"],
//!     "[concat('hello ', parameters('name'))]"
//! );
//! ```

pub mod decompile;
pub mod emit;
pub mod semantic;

pub use decompile::{
    decompile, decompile_to_source, decompile_value, Decompilation, DecompileError,
    DecompiledSource,
};
pub use emit::{emit, emit_for_deployment, EmitError, Emission};
pub use infra_forge_dsl::keywords;
pub use semantic::{bind, DeclaredType, Scope, ScopeId, ScopeKind, SemanticModel, Symbol, SymbolId, TypeKind};

/// Parses and binds DSL source text.
pub fn compile(source: &str) -> SemanticModel {
    bind(infra_forge_dsl::parse(source))
}
