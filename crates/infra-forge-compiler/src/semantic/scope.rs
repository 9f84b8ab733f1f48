use std::collections::HashMap;

use super::symbol::SymbolId;

/// Index of a scope in its model's scope arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeKind {
    /// Owns the namespace symbols.
    Global,
    /// Owns the functions of one namespace.
    Namespace(&'static str),
    /// Owns the user's declarations. Innermost.
    File,
}

/// A name-to-symbol mapping. Names are unique within a scope.
#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    symbols: Vec<SymbolId>,
    by_name: HashMap<String, SymbolId>,
}

impl Scope {
    pub(crate) fn new(kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Self {
            kind,
            parent,
            symbols: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<SymbolId> {
        self.by_name.get(name).copied()
    }

    /// Symbols in insertion order.
    pub fn symbols(&self) -> &[SymbolId] {
        &self.symbols
    }

    /// Registers `name`. On a clash the scope is unchanged and the existing
    /// symbol is returned.
    pub(crate) fn insert(&mut self, name: &str, id: SymbolId) -> Result<(), SymbolId> {
        if let Some(existing) = self.get(name) {
            return Err(existing);
        }
        self.by_name.insert(name.to_string(), id);
        self.symbols.push(id);
        Ok(())
    }
}
