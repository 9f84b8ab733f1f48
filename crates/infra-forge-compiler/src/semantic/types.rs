use std::fmt;

/// The value types the binder reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    String,
    Int,
    Bool,
    Object,
    Array,
    Null,
    /// Statically unknown; compatible with everything.
    Any,
    /// The type of an expression that failed to bind.
    Error,
}

impl TypeKind {
    /// Whether a value of this type may be used where `target` is expected.
    pub fn is_assignable_to(self, target: TypeKind) -> bool {
        match (self, target) {
            (Self::Any | Self::Error | Self::Null, _) | (_, Self::Any | Self::Error) => true,
            (a, b) => a == b,
        }
    }

    /// Whether the type is concrete enough to be emitted as a declared type.
    pub fn is_known(self) -> bool {
        !matches!(self, Self::Any | Self::Error | Self::Null)
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Object => "object",
            Self::Array => "array",
            Self::Null => "null",
            Self::Any => "any",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// A type that may be written in a parameter or output annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclaredType {
    String,
    SecureString,
    Int,
    Bool,
    Object,
    SecureObject,
    Array,
}

impl DeclaredType {
    pub const ALL: [DeclaredType; 7] = [
        Self::String,
        Self::SecureString,
        Self::Int,
        Self::Bool,
        Self::Object,
        Self::SecureObject,
        Self::Array,
    ];

    /// Resolves a DSL type annotation. Names are case-sensitive.
    pub fn from_dsl_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.dsl_name() == name)
    }

    /// Resolves a target-format type name. Names are case-insensitive.
    pub fn from_template_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.template_name().eq_ignore_ascii_case(name))
    }

    pub fn dsl_name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::SecureString => "secureString",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Object => "object",
            Self::SecureObject => "secureObject",
            Self::Array => "array",
        }
    }

    pub fn template_name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::SecureString => "securestring",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Object => "object",
            Self::SecureObject => "secureObject",
            Self::Array => "array",
        }
    }

    pub fn kind(self) -> TypeKind {
        match self {
            Self::String | Self::SecureString => TypeKind::String,
            Self::Int => TypeKind::Int,
            Self::Bool => TypeKind::Bool,
            Self::Object | Self::SecureObject => TypeKind::Object,
            Self::Array => TypeKind::Array,
        }
    }

    /// The non-secure declared type for an inferred kind, if there is one.
    pub fn from_kind(kind: TypeKind) -> Option<Self> {
        match kind {
            TypeKind::String => Some(Self::String),
            TypeKind::Int => Some(Self::Int),
            TypeKind::Bool => Some(Self::Bool),
            TypeKind::Object => Some(Self::Object),
            TypeKind::Array => Some(Self::Array),
            TypeKind::Null | TypeKind::Any | TypeKind::Error => None,
        }
    }

    /// Comma-separated list of valid DSL names, for diagnostics.
    pub fn dsl_names() -> String {
        Self::ALL
            .iter()
            .map(|t| format!("'{}'", t.dsl_name()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dsl_name())
    }
}
