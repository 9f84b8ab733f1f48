use infra_forge_core::Span;

use super::namespaces::FunctionSignature;
use super::types::DeclaredType;
use super::ScopeId;

/// Index of a symbol in its model's symbol arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A named entity that expressions can resolve to.
#[derive(Debug, Clone)]
pub enum Symbol {
    Parameter(ParameterSymbol),
    Variable(VariableSymbol),
    Resource(ResourceSymbol),
    Output(OutputSymbol),
    Function(FunctionSymbol),
    Namespace(NamespaceSymbol),
    /// Placeholder bound to an unresolved reference so binding can continue.
    Error(ErrorSymbol),
}

impl Symbol {
    pub fn name(&self) -> &str {
        match self {
            Self::Parameter(s) => &s.name,
            Self::Variable(s) => &s.name,
            Self::Resource(s) => &s.name,
            Self::Output(s) => &s.name,
            Self::Function(s) => s.signature.name,
            Self::Namespace(s) => s.name,
            Self::Error(s) => &s.name,
        }
    }

    /// Noun used in diagnostics, e.g. "parameter".
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Parameter(_) => "parameter",
            Self::Variable(_) => "variable",
            Self::Resource(_) => "resource",
            Self::Output(_) => "output",
            Self::Function(_) => "function",
            Self::Namespace(_) => "namespace",
            Self::Error(_) => "unknown symbol",
        }
    }

    /// Index of the declaring syntax node in the program, for user declarations.
    pub fn declaration(&self) -> Option<usize> {
        match self {
            Self::Parameter(s) => Some(s.declaration),
            Self::Variable(s) => Some(s.declaration),
            Self::Resource(s) => Some(s.declaration),
            Self::Output(s) => Some(s.declaration),
            Self::Function(_) | Self::Namespace(_) | Self::Error(_) => None,
        }
    }

    /// Span of the declared name, for user declarations.
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Parameter(s) => Some(s.span),
            Self::Variable(s) => Some(s.span),
            Self::Resource(s) => Some(s.span),
            Self::Output(s) => Some(s.span),
            Self::Function(_) | Self::Namespace(_) | Self::Error(_) => None,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Self::Function(_))
    }
}

#[derive(Debug, Clone)]
pub struct ParameterSymbol {
    pub name: String,
    pub span: Span,
    pub declaration: usize,
    /// `None` when the annotation names an unknown type.
    pub declared_type: Option<DeclaredType>,
}

#[derive(Debug, Clone)]
pub struct VariableSymbol {
    pub name: String,
    pub span: Span,
    pub declaration: usize,
}

#[derive(Debug, Clone)]
pub struct ResourceSymbol {
    pub name: String,
    pub span: Span,
    pub declaration: usize,
    /// `(full type, api version)` when the type header is well formed.
    pub resource_type: Option<(String, String)>,
}

impl ResourceSymbol {
    pub fn full_type(&self) -> Option<&str> {
        self.resource_type.as_ref().map(|(t, _)| t.as_str())
    }

    pub fn api_version(&self) -> Option<&str> {
        self.resource_type.as_ref().map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct OutputSymbol {
    pub name: String,
    pub span: Span,
    pub declaration: usize,
    pub declared_type: Option<DeclaredType>,
}

#[derive(Debug, Clone)]
pub struct FunctionSymbol {
    pub signature: &'static FunctionSignature,
    /// The namespace scope that owns this function.
    pub namespace: ScopeId,
}

#[derive(Debug, Clone)]
pub struct NamespaceSymbol {
    pub name: &'static str,
    /// The scope holding this namespace's functions.
    pub scope: ScopeId,
}

#[derive(Debug, Clone)]
pub struct ErrorSymbol {
    pub name: String,
}
