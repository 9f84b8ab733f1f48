use logos::Logos;

use crate::error::{ErrorInfo, ExpressionError};
use crate::span::LineIndex;

use super::token::{ExpressionToken, RawToken, TokenKind, TokenValue};

/// Tokenizes `source[start..end]` in a single left-to-right pass.
///
/// Positions are resolved against `index`, which must be built over the whole
/// `source`, so columns account for text outside the scanned range (such as the
/// opening bracket). The returned stream always ends with an end-of-input token.
///
/// # Errors
///
/// Returns the first `ExpressionError::Lexical` encountered. Scanning does not
/// resume after an error.
pub fn tokenize(
    source: &str,
    start: usize,
    end: usize,
    index: &LineIndex,
) -> Result<Vec<ExpressionToken>, ExpressionError> {
    let text = &source[start..end];
    let mut tokens = Vec::new();

    for (result, range) in RawToken::lexer(text).spanned() {
        let position = index.position(start + range.start);
        match result {
            Ok(raw) => {
                let (kind, value) = classify(raw);
                tokens.push(ExpressionToken::new(kind, value, position));
            }
            Err(kind) => {
                return Err(ExpressionError::Lexical {
                    kind,
                    text: text[range].to_string(),
                    info: ErrorInfo::new(position.line, position.column),
                });
            }
        }
    }

    tokens.push(ExpressionToken::new(
        TokenKind::EndOfInput,
        TokenValue::None,
        index.position(end),
    ));
    Ok(tokens)
}

fn classify(raw: RawToken) -> (TokenKind, TokenValue) {
    match raw {
        RawToken::Identifier(name) => (TokenKind::Identifier, TokenValue::Text(name)),
        RawToken::String(value) => (TokenKind::StringLiteral, TokenValue::Text(value)),
        RawToken::Integer(n) => (TokenKind::IntegerLiteral, TokenValue::Integer(n)),
        RawToken::LeftParenthesis => (TokenKind::LeftParenthesis, TokenValue::None),
        RawToken::RightParenthesis => (TokenKind::RightParenthesis, TokenValue::None),
        RawToken::LeftSquareBracket => (TokenKind::LeftSquareBracket, TokenValue::None),
        RawToken::RightSquareBracket => (TokenKind::RightSquareBracket, TokenValue::None),
        RawToken::Comma => (TokenKind::Comma, TokenValue::None),
        RawToken::Dot => (TokenKind::Dot, TokenValue::None),
    }
}
