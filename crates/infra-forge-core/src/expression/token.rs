use std::fmt;

use logos::Logos;

use crate::error::LexicalErrorKind;
use crate::span::Position;

/// Raw tokens recognised by logos inside a language expression.
///
/// Whitespace is skipped. Strings and integers are decoded by callbacks so
/// the lexer reports unterminated strings and bad numbers as distinct errors.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexicalErrorKind)]
#[logos(skip r"[ \t\r\n\f]+")]
pub(crate) enum RawToken {
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    #[token("'", lex_string)]
    String(String),

    #[regex(r"-?[0-9]+(\.[0-9]+)?", lex_integer)]
    Integer(i64),

    #[token("(")]
    LeftParenthesis,

    #[token(")")]
    RightParenthesis,

    #[token("[")]
    LeftSquareBracket,

    #[token("]")]
    RightSquareBracket,

    #[token(",")]
    Comma,

    #[token(".")]
    Dot,
}

/// Scans a single-quoted string after its opening quote. `''` is an escaped quote.
fn lex_string(lex: &mut logos::Lexer<RawToken>) -> Result<String, LexicalErrorKind> {
    let remainder = lex.remainder();
    let mut value = String::new();
    let mut chars = remainder.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '\'' {
            if let Some(&(_, '\'')) = chars.peek() {
                chars.next();
                value.push('\'');
                continue;
            }
            lex.bump(i + 1);
            return Ok(value);
        }
        value.push(c);
    }
    lex.bump(remainder.len());
    Err(LexicalErrorKind::UnterminatedString)
}

fn lex_integer(lex: &mut logos::Lexer<RawToken>) -> Result<i64, LexicalErrorKind> {
    let text = lex.slice();
    if text.contains('.') {
        return Err(LexicalErrorKind::InvalidNumber);
    }
    text.parse::<i64>()
        .map_err(|_| LexicalErrorKind::InvalidNumber)
}

/// The closed set of expression token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    StringLiteral,
    IntegerLiteral,
    LeftParenthesis,
    RightParenthesis,
    LeftSquareBracket,
    RightSquareBracket,
    Comma,
    Dot,
    BeginOfInput,
    EndOfInput,
}

impl TokenKind {
    /// Returns a human-readable description of this token kind.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Identifier => "identifier",
            Self::StringLiteral => "string literal",
            Self::IntegerLiteral => "integer literal",
            Self::LeftParenthesis => "'('",
            Self::RightParenthesis => "')'",
            Self::LeftSquareBracket => "'['",
            Self::RightSquareBracket => "']'",
            Self::Comma => "','",
            Self::Dot => "'.'",
            Self::BeginOfInput => "beginning of expression",
            Self::EndOfInput => "end of expression",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Literal payload of a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenValue {
    None,
    Text(String),
    Integer(i64),
}

/// An immutable expression token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionToken {
    pub kind: TokenKind,
    pub value: TokenValue,
    pub position: Position,
}

impl ExpressionToken {
    /// Sentinel preceding the first token of every stream.
    pub const BEGIN_OF_INPUT: ExpressionToken = ExpressionToken {
        kind: TokenKind::BeginOfInput,
        value: TokenValue::None,
        position: Position::START,
    };

    /// Sentinel returned for any lookahead past the end of a stream.
    pub const END_OF_INPUT: ExpressionToken = ExpressionToken {
        kind: TokenKind::EndOfInput,
        value: TokenValue::None,
        position: Position::START,
    };

    pub fn new(kind: TokenKind, value: TokenValue, position: Position) -> Self {
        Self {
            kind,
            value,
            position,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.value {
            TokenValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Renders the token as it would appear in expression text.
    pub fn to_expression(&self) -> String {
        match (&self.kind, &self.value) {
            (TokenKind::StringLiteral, TokenValue::Text(s)) => format!("'{}'", s.replace('\'', "''")),
            (_, TokenValue::Text(s)) => s.clone(),
            (_, TokenValue::Integer(n)) => n.to_string(),
            (TokenKind::LeftParenthesis, _) => "(".to_string(),
            (TokenKind::RightParenthesis, _) => ")".to_string(),
            (TokenKind::LeftSquareBracket, _) => "[".to_string(),
            (TokenKind::RightSquareBracket, _) => "]".to_string(),
            (TokenKind::Comma, _) => ",".to_string(),
            (TokenKind::Dot, _) => ".".to_string(),
            _ => String::new(),
        }
    }
}
