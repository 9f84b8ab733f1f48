//! The template mini-language: a tokenizer and recursive descent parser for
//! the `[function(args).property[index]]` expressions embedded in target-format
//! string values.

mod ast;
mod lexer;
mod parser;
mod token;

pub use ast::{FunctionCall, LanguageExpression, Literal};
pub use lexer::tokenize;
pub use parser::parse_tokens;
pub use token::{ExpressionToken, TokenKind, TokenValue};

use crate::error::{ErrorInfo, ExpressionError};
use crate::span::LineIndex;

/// Upper bound, in characters, on the length of a single expression string.
pub const EXPRESSION_LIMIT: usize = 81_920;

/// Deepest nesting of parentheses, arguments, indexes and property links
/// accepted in one expression.
pub const MAX_NESTING_DEPTH: usize = 128;

/// Determines whether `text` is syntactically a language expression candidate.
///
/// A candidate starts with `[`, ends with `]`, has a non-empty interior, and
/// does not start with `[[`, which escapes a literal string beginning with `[`.
pub fn is_language_expression(text: &str) -> bool {
    text.len() > 2 && text.starts_with('[') && text.ends_with(']') && !text.starts_with("[[")
}

/// Parses a bracketed language expression such as `[concat('a', 'b')]`.
///
/// `context` locates the string inside its enclosing document. Reported
/// positions are offset by it, and its path is attached to any error.
///
/// # Errors
///
/// - `ExpressionError::LimitExceeded` when `text` is longer than
///   [`EXPRESSION_LIMIT`], before any tokenizing happens.
/// - `ExpressionError::Lexical` / `ExpressionError::Syntax` for malformed input.
pub fn parse_language_expression(
    text: &str,
    context: Option<&ErrorInfo>,
) -> Result<LanguageExpression, ExpressionError> {
    check_limit(text)?;

    let result = if is_language_expression(text) {
        let index = LineIndex::new(text);
        tokenize(text, 1, text.len() - 1, &index).and_then(|tokens| parse_tokens(&tokens))
    } else {
        Err(ExpressionError::Syntax {
            message: "value is not a language expression; expected '[' ... ']'".to_string(),
            info: ErrorInfo::new(1, 1),
        })
    };

    result.map_err(|err| match context {
        Some(context) => relocate(err, context),
        None => err,
    })
}

/// Fails with `LimitExceeded` when `text` is over [`EXPRESSION_LIMIT`] characters.
pub fn check_limit(text: &str) -> Result<(), ExpressionError> {
    // Byte length bounds the character count from above.
    if text.len() <= EXPRESSION_LIMIT {
        return Ok(());
    }
    let length = text.chars().count();
    if length > EXPRESSION_LIMIT {
        tracing::debug!(length, "expression rejected by length limit");
        return Err(ExpressionError::LimitExceeded {
            length,
            limit: EXPRESSION_LIMIT,
        });
    }
    Ok(())
}

fn relocate(err: ExpressionError, context: &ErrorInfo) -> ExpressionError {
    let shift = |info: ErrorInfo| {
        let line_position = if info.line_number <= 1 {
            context.line_position + info.line_position.saturating_sub(1)
        } else {
            info.line_position
        };
        ErrorInfo {
            line_number: context.line_number + info.line_number.saturating_sub(1),
            line_position,
            path: context.path.clone().or(info.path),
        }
    };

    match err {
        ExpressionError::Lexical { kind, text, info } => ExpressionError::Lexical {
            kind,
            text,
            info: shift(info),
        },
        ExpressionError::Syntax { message, info } => ExpressionError::Syntax {
            message,
            info: shift(info),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expression_candidates() {
        assert!(is_language_expression("[concat('a')]"));
        assert!(is_language_expression("[x]"));
        assert!(!is_language_expression("[]"));
        assert!(!is_language_expression("[[escaped]"));
        assert!(!is_language_expression("plain"));
        assert!(!is_language_expression("[unclosed"));
        assert!(!is_language_expression(""));
    }

    #[test]
    fn parse_strips_brackets() {
        let expr = parse_language_expression("[parameters('name')]", None).unwrap();
        assert_eq!(expr.to_string(), "parameters('name')");
    }

    #[test]
    fn non_expression_is_syntax_error() {
        let err = parse_language_expression("hello", None).unwrap_err();
        assert!(matches!(err, ExpressionError::Syntax { .. }));
    }

    #[test]
    fn columns_include_the_opening_bracket() {
        let err = parse_language_expression("[f(1,)]", None).unwrap_err();
        assert_eq!(err.info().unwrap().line_position, 5);
    }

    #[test]
    fn context_offsets_position_and_sets_path() {
        let context = ErrorInfo::new(10, 20).with_path("variables.greeting");
        let err = parse_language_expression("[f(1,)]", Some(&context)).unwrap_err();
        let info = err.info().unwrap();
        assert_eq!(info.line_number, 10);
        assert_eq!(info.line_position, 24);
        assert_eq!(info.path.as_deref(), Some("variables.greeting"));
    }

    #[test]
    fn limit_is_inclusive() {
        let filler = "a".repeat(EXPRESSION_LIMIT - "[concat('')]".len());
        let at_limit = format!("[concat('{filler}')]");
        assert_eq!(at_limit.chars().count(), EXPRESSION_LIMIT);
        assert!(parse_language_expression(&at_limit, None).is_ok());

        let over_limit = format!("[concat('{filler}a')]");
        assert_eq!(over_limit.chars().count(), EXPRESSION_LIMIT + 1);
        assert_eq!(
            parse_language_expression(&over_limit, None).unwrap_err(),
            ExpressionError::LimitExceeded {
                length: EXPRESSION_LIMIT + 1,
                limit: EXPRESSION_LIMIT,
            }
        );
    }

    #[test]
    fn limit_checked_before_tokenizing() {
        // Malformed but oversized text still reports the limit, not a lexical error.
        let text = format!("[{}]", "#".repeat(EXPRESSION_LIMIT));
        assert!(parse_language_expression(&text, None)
            .unwrap_err()
            .is_fatal());
    }
}
