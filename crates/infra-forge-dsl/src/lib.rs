//! # infra-forge-dsl
//!
//! Parser and printer for the infra-forge declaration language.
//!
//! This crate provides:
//! - A lexer that tokenizes `.infra` source files, with significant newlines
//! - A recursive descent parser that always produces a [`Program`], recording
//!   lexical and syntax errors as diagnostics next to skip nodes
//! - A printer that converts a syntax tree back to DSL text
//! - Round-trip fidelity: `parse(print(program))` produces an equivalent tree
//!
//! # Example
//!
//! ```
//! use infra_forge_dsl::{parse, print};
//!
//! let source = r#"
//! parameter name: string
//! variable greeting = concat('hello ', name)
//! output result: string = greeting
//! "#;
//!
//! let program = parse(source);
//! assert!(program.diagnostics.is_empty());
//! assert_eq!(program.declarations.len(), 3);
//!
//! let text = print(&program);
//! assert!(text.contains("variable greeting = concat('hello ', name)"));
//! ```

pub mod error;
mod lexer;
pub mod parser;
pub mod printer;
pub mod syntax;
pub mod token;

pub use error::DslError;
pub use parser::parse;
pub use printer::{print, print_declarations, print_expression};
pub use syntax::{
    Declaration, Expression, ExpressionKind, Identifier, NodeId, NodeIds, ObjectProperty,
    OutputDeclaration, ParameterDeclaration, Program, ResourceDeclaration, ResourceTypeReference,
    StringSegment, TypeAnnotation, VariableDeclaration,
};
pub use token::{is_keyword, keywords};
