use std::fmt;

use serde::{Deserialize, Serialize};

/// Structured location context attached to an expression error.
///
/// Kept separate from the message so that consumers can render it in
/// whatever format they need.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    /// 1-based line of the offending token.
    pub line_number: usize,
    /// 1-based column of the offending token.
    pub line_position: usize,
    /// Logical path of the value being parsed, e.g. `resources[0].properties.name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ErrorInfo {
    pub fn new(line_number: usize, line_position: usize) -> Self {
        Self {
            line_number,
            line_position,
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// The kinds of malformed token the expression tokenizer can reject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LexicalErrorKind {
    UnterminatedString,
    InvalidNumber,
    #[default]
    UnrecognizedCharacter,
}

impl fmt::Display for LexicalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedString => write!(f, "unterminated string literal"),
            Self::InvalidNumber => write!(f, "invalid numeric literal"),
            Self::UnrecognizedCharacter => write!(f, "unrecognized character"),
        }
    }
}

/// Errors produced by the expression engine.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExpressionError {
    /// The tokenizer rejected part of the input.
    Lexical {
        kind: LexicalErrorKind,
        text: String,
        info: ErrorInfo,
    },

    /// The token stream does not match the grammar.
    Syntax { message: String, info: ErrorInfo },

    /// The expression text is longer than the hard ceiling. Raised before tokenizing.
    LimitExceeded { length: usize, limit: usize },
}

impl ExpressionError {
    /// Location context, when the error has one.
    pub fn info(&self) -> Option<&ErrorInfo> {
        match self {
            Self::Lexical { info, .. } | Self::Syntax { info, .. } => Some(info),
            Self::LimitExceeded { .. } => None,
        }
    }

    /// True for the conditions that must abort a whole document.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::LimitExceeded { .. })
    }

    /// Replaces (or sets) the logical path carried by this error.
    pub fn with_path(self, path: impl Into<String>) -> Self {
        match self {
            Self::Lexical { kind, text, info } => Self::Lexical {
                kind,
                text,
                info: info.with_path(path),
            },
            Self::Syntax { message, info } => Self::Syntax {
                message,
                info: info.with_path(path),
            },
            other => other,
        }
    }
}

impl fmt::Display for ExpressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lexical { kind, text, info } => {
                write!(
                    f,
                    "{kind} '{text}' at line {}, column {}",
                    info.line_number, info.line_position
                )
            }
            Self::Syntax { message, info } => {
                write!(
                    f,
                    "{message} at line {}, column {}",
                    info.line_number, info.line_position
                )
            }
            Self::LimitExceeded { length, limit } => {
                write!(
                    f,
                    "expression is {length} characters long, exceeding the limit of {limit}"
                )
            }
        }
    }
}

impl std::error::Error for ExpressionError {}
