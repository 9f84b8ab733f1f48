use std::fmt;

use serde::{Deserialize, Serialize};

/// A literal value shared by the mini-language and the DSL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Literal {
    String(String),
    Integer(i64),
    Boolean(bool),
    Null,
}

impl fmt::Display for Literal {
    /// Formats the literal as mini-language text.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Null => write!(f, "null()"),
        }
    }
}

/// A function call, optionally namespace-qualified (`ns.name(...)`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionCall {
    pub namespace: Option<String>,
    pub name: String,
    pub arguments: Vec<LanguageExpression>,
}

/// A parsed mini-language expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LanguageExpression {
    Literal(Literal),
    FunctionCall(FunctionCall),
    PropertyAccess {
        base: Box<LanguageExpression>,
        property: String,
    },
    ArrayAccess {
        base: Box<LanguageExpression>,
        index: Box<LanguageExpression>,
    },
}

impl LanguageExpression {
    pub fn string(value: impl Into<String>) -> Self {
        Self::Literal(Literal::String(value.into()))
    }

    pub fn integer(value: i64) -> Self {
        Self::Literal(Literal::Integer(value))
    }

    pub fn call(name: impl Into<String>, arguments: Vec<LanguageExpression>) -> Self {
        Self::FunctionCall(FunctionCall {
            namespace: None,
            name: name.into(),
            arguments,
        })
    }

    pub fn property(self, property: impl Into<String>) -> Self {
        Self::PropertyAccess {
            base: Box::new(self),
            property: property.into(),
        }
    }

    pub fn index(self, index: LanguageExpression) -> Self {
        Self::ArrayAccess {
            base: Box::new(self),
            index: Box::new(index),
        }
    }

    /// Returns the call when this is an unqualified call to `name` (case-insensitive).
    pub fn as_call_to(&self, name: &str) -> Option<&FunctionCall> {
        match self {
            Self::FunctionCall(call)
                if call.namespace.is_none() && call.name.eq_ignore_ascii_case(name) =>
            {
                Some(call)
            }
            _ => None,
        }
    }

    pub fn as_string_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(Literal::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Wraps the expression in the target format's `[...]` convention.
    pub fn to_template_string(&self) -> String {
        format!("[{self}]")
    }
}

impl fmt::Display for LanguageExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(literal) => write!(f, "{literal}"),
            Self::FunctionCall(call) => {
                if let Some(namespace) = &call.namespace {
                    write!(f, "{namespace}.")?;
                }
                write!(f, "{}(", call.name)?;
                for (i, argument) in call.arguments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{argument}")?;
                }
                f.write_str(")")
            }
            Self::PropertyAccess { base, property } => write!(f, "{base}.{property}"),
            Self::ArrayAccess { base, index } => write!(f, "{base}[{index}]"),
        }
    }
}
