use infra_forge_core::LexicalErrorKind;
use logos::Logos;

/// Tokens produced by the infra DSL lexer.
///
/// Horizontal whitespace and comments are skipped by logos. Newlines are
/// significant: they terminate declarations and separate object properties
/// and array items.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(error = LexicalErrorKind)]
#[logos(skip r"[ \t\r\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*+[^*/])*\*+/")]
pub enum Token {
    // -- Keywords --
    #[token("parameter")]
    Parameter,

    #[token("variable")]
    Variable,

    #[token("resource")]
    Resource,

    #[token("output")]
    Output,

    #[token("true")]
    True,

    #[token("false")]
    False,

    #[token("null")]
    Null,

    // -- Layout --
    #[token("\n")]
    Newline,

    // -- Punctuation --
    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token(":")]
    Colon,

    #[token(",")]
    Comma,

    #[token(".")]
    Dot,

    #[token("=")]
    Equals,

    // -- Literals --
    /// A single-quoted string, possibly containing `${...}` holes.
    #[token("'", lex_string)]
    StringLiteral,

    /// An integer literal, optionally negative, e.g. `42` or `-10`.
    #[regex(r"-?[0-9]+")]
    IntegerLiteral,

    // -- Identifiers --
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,
}

impl Token {
    /// Returns a human-readable description of this token kind.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Parameter => "'parameter'",
            Self::Variable => "'variable'",
            Self::Resource => "'resource'",
            Self::Output => "'output'",
            Self::True => "'true'",
            Self::False => "'false'",
            Self::Null => "'null'",
            Self::Newline => "newline",
            Self::LBrace => "'{'",
            Self::RBrace => "'}'",
            Self::LParen => "'('",
            Self::RParen => "')'",
            Self::LBracket => "'['",
            Self::RBracket => "']'",
            Self::Colon => "':'",
            Self::Comma => "','",
            Self::Dot => "'.'",
            Self::Equals => "'='",
            Self::StringLiteral => "string literal",
            Self::IntegerLiteral => "integer literal",
            Self::Ident => "identifier",
        }
    }

    /// True for the keywords that start a top-level declaration.
    pub fn is_declaration_keyword(&self) -> bool {
        matches!(
            self,
            Self::Parameter | Self::Variable | Self::Resource | Self::Output
        )
    }

    /// True for any reserved word.
    pub fn is_keyword(&self) -> bool {
        self.is_declaration_keyword() || matches!(self, Self::True | Self::False | Self::Null)
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Every reserved word of the language.
pub const KEYWORDS: &[&str] = &[
    "parameter", "variable", "resource", "output", "true", "false", "null",
];

/// The keywords that start a top-level declaration, in printing order.
pub fn keywords() -> &'static [&'static str] {
    &KEYWORDS[..4]
}

pub fn is_keyword(text: &str) -> bool {
    KEYWORDS.contains(&text)
}

/// Consumes the string body after its opening quote, including any nested
/// `${...}` holes and the strings inside them.
fn lex_string(lex: &mut logos::Lexer<Token>) -> Result<(), LexicalErrorKind> {
    let remainder = lex.remainder();
    match scan_string_body(remainder) {
        Some(len) => {
            lex.bump(len);
            Ok(())
        }
        None => {
            // Resume on the next line.
            lex.bump(remainder.find('\n').unwrap_or(remainder.len()));
            Err(LexicalErrorKind::UnterminatedString)
        }
    }
}

/// Returns the byte length of a string body up to and including its closing
/// quote, or `None` if the line ends first.
pub(crate) fn scan_string_body(text: &str) -> Option<usize> {
    scan(text, 0, Scope::String)
}

/// Returns the index just past the `}` closing a hole whose body starts at `start`.
pub(crate) fn hole_end(text: &str, start: usize) -> Option<usize> {
    scan(text, start, Scope::Hole)
}

/// What the string scanner is inside of.
#[derive(Clone, Copy)]
enum Scope {
    String,
    Hole,
    Brace,
}

/// Scans until the `outer` scope closes. Nested strings and holes live on an
/// explicit stack, so nesting depth costs no recursion.
fn scan(text: &str, start: usize, outer: Scope) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut scopes = vec![outer];
    let mut i = start;
    while let Some(&scope) = scopes.last() {
        let byte = *bytes.get(i)?;
        match (scope, byte) {
            (_, b'\n') => return None,
            (Scope::String, b'\\') => {
                i += 2;
                continue;
            }
            (Scope::String, b'\'') => {
                scopes.pop();
            }
            (Scope::String, b'$') if bytes.get(i + 1) == Some(&b'{') => {
                scopes.push(Scope::Hole);
                i += 2;
                continue;
            }
            (Scope::String, _) => {}
            (_, b'{') => scopes.push(Scope::Brace),
            (_, b'}') => {
                scopes.pop();
            }
            (_, b'\'') => scopes.push(Scope::String),
            _ => {}
        }
        i += 1;
    }
    Some(i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<Token> {
        Token::lexer(input).map(|r| r.expect("lex error")).collect()
    }

    #[test]
    fn keywords_lex() {
        let tokens = lex("parameter variable resource output true false null");
        assert_eq!(
            tokens,
            vec![
                Token::Parameter,
                Token::Variable,
                Token::Resource,
                Token::Output,
                Token::True,
                Token::False,
                Token::Null,
            ]
        );
    }

    #[test]
    fn keyword_prefix_is_identifier() {
        assert_eq!(lex("parameters outputName"), vec![Token::Ident, Token::Ident]);
    }

    #[test]
    fn punctuation() {
        let tokens = lex("{ } ( ) [ ] : , . =");
        assert_eq!(
            tokens,
            vec![
                Token::LBrace,
                Token::RBrace,
                Token::LParen,
                Token::RParen,
                Token::LBracket,
                Token::RBracket,
                Token::Colon,
                Token::Comma,
                Token::Dot,
                Token::Equals,
            ]
        );
    }

    #[test]
    fn newlines_are_tokens() {
        assert_eq!(
            lex("a\r\nb\n"),
            vec![Token::Ident, Token::Newline, Token::Ident, Token::Newline]
        );
    }

    #[test]
    fn comments_skipped() {
        assert_eq!(lex("a // trailing\nb"), vec![Token::Ident, Token::Newline, Token::Ident]);
        assert_eq!(lex("a /* block */ b"), vec![Token::Ident, Token::Ident]);
    }

    #[test]
    fn deeply_nested_holes_are_one_token() {
        let levels = 20_000;
        let source = format!("{}'x'{}", "'${".repeat(levels), "}'".repeat(levels));
        let mut lexer = Token::lexer(&source);
        assert_eq!(lexer.next(), Some(Ok(Token::StringLiteral)));
        assert_eq!(lexer.span(), 0..source.len());
        assert_eq!(lexer.next(), None);
    }

    #[test]
    fn hole_end_skips_braces_and_strings() {
        let body = "f({a: '}'}) } tail";
        assert_eq!(hole_end(body, 0), Some(13));
        assert_eq!(hole_end("never closed", 0), None);
        assert_eq!(hole_end("a\n}", 0), None);
    }

    #[test]
    fn block_comments_with_runs_of_stars() {
        for source in ["a /* x **/ b", "a /***/ b", "a /** doc * text */ b", "a /* 2*3 **x* */ b"] {
            assert_eq!(lex(source), vec![Token::Ident, Token::Ident], "{source}");
        }
        assert_eq!(
            lex("a /* one */ b /* two **/ c"),
            vec![Token::Ident, Token::Ident, Token::Ident]
        );
    }

    #[test]
    fn string_with_nested_hole_is_one_token() {
        let source = r"'a${concat('}', name)}b' x";
        let mut lexer = Token::lexer(source);
        assert_eq!(lexer.next(), Some(Ok(Token::StringLiteral)));
        assert_eq!(lexer.slice(), r"'a${concat('}', name)}b'");
        assert_eq!(lexer.next(), Some(Ok(Token::Ident)));
    }

    #[test]
    fn escaped_quote_does_not_terminate() {
        let mut lexer = Token::lexer(r"'it\'s'");
        assert_eq!(lexer.next(), Some(Ok(Token::StringLiteral)));
        assert_eq!(lexer.slice(), r"'it\'s'");
    }

    #[test]
    fn unterminated_string_stops_at_line_end() {
        let mut lexer = Token::lexer("'abc\nnext");
        assert_eq!(lexer.next(), Some(Err(LexicalErrorKind::UnterminatedString)));
        assert_eq!(lexer.next(), Some(Ok(Token::Newline)));
        assert_eq!(lexer.next(), Some(Ok(Token::Ident)));
    }

    #[test]
    fn integer_literals() {
        assert_eq!(
            lex("0 42 -10"),
            vec![Token::IntegerLiteral, Token::IntegerLiteral, Token::IntegerLiteral]
        );
    }

    #[test]
    fn keyword_tables() {
        assert_eq!(keywords(), &["parameter", "variable", "resource", "output"]);
        assert!(is_keyword("null"));
        assert!(!is_keyword("name"));
        assert!(Token::Output.is_declaration_keyword());
        assert!(!Token::True.is_declaration_keyword());
        assert!(Token::True.is_keyword());
    }
}
