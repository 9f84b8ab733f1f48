//! Name resolution and type checking over a parsed [`Program`].
//!
//! [`bind`] builds a read-only [`SemanticModel`]: a scope tree (global scope
//! owning the builtin namespaces, and a file scope owning the user's
//! declarations), a symbol arena, the symbol every reference and call node
//! resolved to, the reference graph between declarations, and the combined
//! parse and binding diagnostics.

mod binder;
pub mod cycles;
pub mod namespaces;
mod scope;
mod symbol;
pub mod types;

use std::collections::{HashMap, HashSet};

use infra_forge_core::Diagnostic;
use infra_forge_dsl::{NodeId, Program};

pub use binder::bind;
pub use scope::{Scope, ScopeId, ScopeKind};
pub use symbol::{
    ErrorSymbol, FunctionSymbol, NamespaceSymbol, OutputSymbol, ParameterSymbol, ResourceSymbol,
    Symbol, SymbolId, VariableSymbol,
};
pub use types::{DeclaredType, TypeKind};

/// The bound form of one program. Immutable once built.
#[derive(Debug, Clone)]
pub struct SemanticModel {
    program: Program,
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
    global: ScopeId,
    file: ScopeId,
    imports: Vec<ScopeId>,
    bindings: HashMap<NodeId, SymbolId>,
    declaration_symbols: Vec<Option<SymbolId>>,
    references: Vec<Vec<usize>>,
    declaration_types: Vec<TypeKind>,
    cycles: Vec<Vec<usize>>,
    diagnostics: Vec<Diagnostic>,
}

impl SemanticModel {
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Parse and binding diagnostics, ordered by position.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        infra_forge_core::has_errors(&self.diagnostics)
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn global_scope(&self) -> ScopeId {
        self.global
    }

    pub fn file_scope(&self) -> ScopeId {
        self.file
    }

    /// The symbol a reference or call node resolved to.
    pub fn binding(&self, node: NodeId) -> Option<&Symbol> {
        self.bindings.get(&node).map(|id| self.symbol(*id))
    }

    /// The symbol created for the declaration at `index` in the program,
    /// including declarations whose name clashed with an earlier one.
    pub fn declaration_symbol(&self, index: usize) -> Option<&Symbol> {
        self.declaration_symbols
            .get(index)
            .copied()
            .flatten()
            .map(|id| self.symbol(id))
    }

    /// Declarations referenced from the body of declaration `index`, sorted.
    pub fn references(&self, index: usize) -> &[usize] {
        self.references.get(index).map_or(&[], Vec::as_slice)
    }

    /// The value type of declaration `index`: declared, or inferred when
    /// there is no annotation.
    pub fn declaration_type(&self, index: usize) -> TypeKind {
        self.declaration_types
            .get(index)
            .copied()
            .unwrap_or(TypeKind::Error)
    }

    /// Reference cycles, one per strongly connected component, as sorted
    /// declaration indices.
    pub fn cycles(&self) -> &[Vec<usize>] {
        &self.cycles
    }

    /// Resolves `name` from the file scope: file, then global, then the
    /// functions of the imported namespaces in order.
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        lookup_in(&self.scopes, self.file, &self.imports, name)
    }

    /// Every symbol visible from the file scope, for completion: non-output
    /// declarations in source order, then imported functions. Names are
    /// unique; a declaration hides a function of the same name.
    pub fn accessible_symbols(&self) -> Vec<&Symbol> {
        let mut seen = HashSet::new();
        let declarations = self
            .scope(self.file)
            .symbols()
            .iter()
            .map(|id| self.symbol(*id))
            .filter(|symbol| !matches!(symbol, Symbol::Output(_)));
        let functions = self
            .imports
            .iter()
            .flat_map(|scope| self.scope(*scope).symbols())
            .map(|id| self.symbol(*id));
        declarations
            .chain(functions)
            .filter(|symbol| seen.insert(symbol.name().to_string()))
            .collect()
    }
}

fn lookup_in(scopes: &[Scope], from: ScopeId, imports: &[ScopeId], name: &str) -> Option<SymbolId> {
    let mut current = Some(from);
    while let Some(id) = current {
        let scope = &scopes[id.index()];
        if let Some(symbol) = scope.get(name) {
            return Some(symbol);
        }
        current = scope.parent;
    }
    imports
        .iter()
        .find_map(|scope| scopes[scope.index()].get(name))
}
