use infra_forge_core::Span;
use logos::Logos;

use crate::error::DslError;
use crate::token::Token;

/// A token paired with its source span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
    pub text: String,
}

/// Tokenizes DSL source text into a sequence of spanned tokens.
///
/// Invalid tokens are collected as `DslError::InvalidToken` errors and left
/// out of the token stream, so the parser can still run over the rest.
pub fn tokenize(source: &str) -> (Vec<SpannedToken>, Vec<DslError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    let lexer = Token::lexer(source);
    for (result, range) in lexer.spanned() {
        let span = Span::new(range.start, range.end);
        match result {
            Ok(token) => {
                tokens.push(SpannedToken {
                    token,
                    span,
                    text: source[range].to_string(),
                });
            }
            Err(kind) => {
                errors.push(DslError::InvalidToken { kind, span });
            }
        }
    }

    tracing::trace!(tokens = tokens.len(), errors = errors.len(), "tokenized source");
    (tokens, errors)
}
