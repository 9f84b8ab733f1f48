use std::fmt;

use infra_forge_core::{Diagnostic, DiagnosticKind, LexicalErrorKind, LineIndex, Severity, Span};

/// Errors found while lexing or parsing DSL source.
///
/// The parser never stops at one of these. Each is recorded and turned into a
/// [`Diagnostic`] on the resulting program.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DslError {
    /// The lexer could not match a token at this position.
    InvalidToken { kind: LexicalErrorKind, span: Span },

    /// The parser encountered an unexpected token.
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },

    /// The parser reached the end of input when more tokens were expected.
    UnexpectedEndOfInput { expected: String, span: Span },

    /// An integer literal does not fit in 64 bits.
    InvalidIntegerLiteral { text: String, span: Span },

    /// A backslash escape other than `\'`, `\\`, `\n`, `\r`, `\t` or `\$`.
    InvalidEscape { sequence: String, span: Span },

    /// An interpolation hole `${}` with nothing inside.
    EmptyInterpolation { span: Span },

    /// The same key appears twice in one object literal.
    DuplicatePropertyKey { key: String, span: Span },

    /// A `,` directly before the closing `)` of an argument list.
    TrailingComma { span: Span },

    /// A reserved word used where a declaration name is required.
    KeywordAsName { keyword: String, span: Span },

    /// A resource type header that is not a plain string.
    InterpolatedResourceType { span: Span },

    /// Expressions nested deeper than the parser accepts.
    NestingTooDeep { limit: usize, span: Span },
}

impl DslError {
    pub fn span(&self) -> Span {
        match self {
            Self::InvalidToken { span, .. }
            | Self::UnexpectedToken { span, .. }
            | Self::UnexpectedEndOfInput { span, .. }
            | Self::InvalidIntegerLiteral { span, .. }
            | Self::InvalidEscape { span, .. }
            | Self::EmptyInterpolation { span }
            | Self::DuplicatePropertyKey { span, .. }
            | Self::TrailingComma { span }
            | Self::KeywordAsName { span, .. }
            | Self::InterpolatedResourceType { span }
            | Self::NestingTooDeep { span, .. } => *span,
        }
    }

    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Self::InvalidToken { .. } | Self::InvalidEscape { .. } => DiagnosticKind::Lexical,
            _ => DiagnosticKind::Syntax,
        }
    }

    /// Shifts the span of an error found in a sub-range of the source.
    pub(crate) fn shifted(mut self, offset: usize) -> Self {
        let span = match &mut self {
            Self::InvalidToken { span, .. }
            | Self::UnexpectedToken { span, .. }
            | Self::UnexpectedEndOfInput { span, .. }
            | Self::InvalidIntegerLiteral { span, .. }
            | Self::InvalidEscape { span, .. }
            | Self::EmptyInterpolation { span }
            | Self::DuplicatePropertyKey { span, .. }
            | Self::TrailingComma { span }
            | Self::KeywordAsName { span, .. }
            | Self::InterpolatedResourceType { span }
            | Self::NestingTooDeep { span, .. } => span,
        };
        *span = span.shifted(offset);
        self
    }

    pub fn to_diagnostic(&self, index: &LineIndex) -> Diagnostic {
        Diagnostic::new(Severity::Error, self.kind(), self.to_string(), self.span(), index)
    }
}

impl fmt::Display for DslError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidToken { kind, .. } => write!(f, "{kind}"),
            Self::UnexpectedToken {
                expected, found, ..
            } => write!(f, "expected {expected}, found {found}"),
            Self::UnexpectedEndOfInput { expected, .. } => {
                write!(f, "unexpected end of input: expected {expected}")
            }
            Self::InvalidIntegerLiteral { text, .. } => {
                write!(f, "invalid integer literal '{text}': value does not fit in 64 bits")
            }
            Self::InvalidEscape { sequence, .. } => {
                write!(
                    f,
                    "invalid escape sequence '{sequence}'; expected one of \\' \\\\ \\n \\r \\t \\$"
                )
            }
            Self::EmptyInterpolation { .. } => {
                write!(f, "empty interpolation; expected an expression inside '${{}}'")
            }
            Self::DuplicatePropertyKey { key, .. } => {
                write!(f, "duplicate property '{key}' in object literal")
            }
            Self::TrailingComma { .. } => write!(f, "trailing ',' in argument list"),
            Self::KeywordAsName { keyword, .. } => {
                write!(f, "'{keyword}' is a reserved word and cannot be used as a name")
            }
            Self::InterpolatedResourceType { .. } => {
                write!(f, "resource type must be a plain string without interpolation")
            }
            Self::NestingTooDeep { limit, .. } => {
                write!(f, "expression nesting exceeds {limit} levels")
            }
        }
    }
}

impl std::error::Error for DslError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_unexpected_token() {
        let err = DslError::UnexpectedToken {
            expected: "'='".into(),
            found: "'}'".into(),
            span: Span::new(5, 6),
        };
        let msg = err.to_string();
        assert!(msg.contains("expected '='"));
        assert!(msg.contains("found '}'"));
    }

    #[test]
    fn error_display_invalid_escape() {
        let err = DslError::InvalidEscape {
            sequence: "\\q".into(),
            span: Span::new(0, 2),
        };
        assert!(err.to_string().contains("'\\q'"));
    }

    #[test]
    fn lexical_and_syntax_kinds() {
        let lexical = DslError::InvalidToken {
            kind: LexicalErrorKind::UnrecognizedCharacter,
            span: Span::new(0, 1),
        };
        assert_eq!(lexical.kind(), DiagnosticKind::Lexical);
        let syntax = DslError::TrailingComma {
            span: Span::new(0, 1),
        };
        assert_eq!(syntax.kind(), DiagnosticKind::Syntax);
    }

    #[test]
    fn to_diagnostic_resolves_position() {
        let index = LineIndex::new("variable a = 1\nvariable = 2");
        let err = DslError::UnexpectedToken {
            expected: "identifier".into(),
            found: "'='".into(),
            span: Span::new(24, 25),
        };
        let diag = err.to_diagnostic(&index);
        assert_eq!((diag.line, diag.column), (2, 10));
        assert!(diag.is_error());
        assert_eq!(diag.kind, Some(DiagnosticKind::Syntax));
    }

    #[test]
    fn shifted_moves_span() {
        let err = DslError::EmptyInterpolation {
            span: Span::new(1, 3),
        };
        assert_eq!(err.shifted(10).span(), Span::new(11, 13));
    }

    #[test]
    fn error_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(DslError::TrailingComma {
            span: Span::new(0, 1),
        });
        assert!(err.to_string().contains("trailing"));
    }
}
