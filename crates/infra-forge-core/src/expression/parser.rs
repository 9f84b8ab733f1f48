use crate::error::{ErrorInfo, ExpressionError};

use super::ast::{FunctionCall, LanguageExpression, Literal};
use super::token::{ExpressionToken, TokenKind, TokenValue};
use super::MAX_NESTING_DEPTH;

/// Recursive descent parser over an expression token stream.
///
/// Uses a single token of lookahead and consumes the stream exactly once.
/// Nesting is capped at [`MAX_NESTING_DEPTH`] so the recursion, and every
/// later walk over the tree, stays shallow.
struct Parser<'t> {
    tokens: &'t [ExpressionToken],
    pos: usize,
    depth: usize,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [ExpressionToken]) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    // -- Cursor helpers --

    fn peek(&self) -> &ExpressionToken {
        self.tokens
            .get(self.pos)
            .unwrap_or(&ExpressionToken::END_OF_INPUT)
    }

    fn previous(&self) -> &ExpressionToken {
        match self.pos {
            0 => &ExpressionToken::BEGIN_OF_INPUT,
            n => self.tokens.get(n - 1).unwrap_or(&ExpressionToken::END_OF_INPUT),
        }
    }

    fn advance(&mut self) -> ExpressionToken {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn expect(&mut self, kind: TokenKind) -> Result<ExpressionToken, ExpressionError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(kind.description()))
        }
    }

    fn unexpected(&self, expected: &str) -> ExpressionError {
        let found = self.peek();
        let found_text = match found.kind {
            TokenKind::EndOfInput => found.kind.description().to_string(),
            _ => format!("{} '{}'", found.kind.description(), found.to_expression()),
        };
        syntax_error(
            format!("expected {expected} but found {found_text}"),
            found,
        )
    }

    /// Counts one level of nesting. Postfix links count too, since they
    /// deepen the tree without recursing.
    fn descend(&mut self) -> Result<(), ExpressionError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(syntax_error(
                format!("expression nesting exceeds {MAX_NESTING_DEPTH} levels"),
                self.peek(),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    // -- Grammar productions --

    /// input = expression END
    fn parse_input(&mut self) -> Result<LanguageExpression, ExpressionError> {
        let expression = self.parse_expression()?;
        if !self.check(TokenKind::EndOfInput) {
            return Err(self.unexpected("end of expression"));
        }
        Ok(expression)
    }

    /// expression = primary ( "." IDENT | "[" expression "]" )*
    fn parse_expression(&mut self) -> Result<LanguageExpression, ExpressionError> {
        let outer = self.depth;
        self.descend()?;
        let mut expression = self.parse_primary()?;
        loop {
            match self.peek().kind {
                TokenKind::Dot => {
                    self.descend()?;
                    self.advance();
                    let property = self.expect(TokenKind::Identifier)?;
                    expression = expression.property(identifier_text(&property));
                }
                TokenKind::LeftSquareBracket => {
                    self.descend()?;
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(TokenKind::RightSquareBracket)?;
                    expression = expression.index(index);
                }
                _ => {
                    self.depth = outer;
                    return Ok(expression);
                }
            }
        }
    }

    /// primary = STRING | INTEGER | IDENT call_tail | "(" expression ")"
    fn parse_primary(&mut self) -> Result<LanguageExpression, ExpressionError> {
        match self.peek().kind {
            TokenKind::StringLiteral => {
                let token = self.advance();
                Ok(LanguageExpression::string(identifier_text(&token)))
            }
            TokenKind::IntegerLiteral => match self.advance().value {
                TokenValue::Integer(n) => Ok(LanguageExpression::integer(n)),
                _ => Err(syntax_error("malformed integer token", self.previous())),
            },
            TokenKind::Identifier => self.parse_identifier_expression(),
            TokenKind::LeftParenthesis => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RightParenthesis)?;
                Ok(inner)
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /// IDENT "(" args ")" | IDENT "." IDENT "(" args ")" | "true" | "false"
    fn parse_identifier_expression(&mut self) -> Result<LanguageExpression, ExpressionError> {
        let first = self.advance();
        let first_name = identifier_text(&first);

        match self.peek().kind {
            TokenKind::LeftParenthesis => {
                let arguments = self.parse_arguments()?;
                Ok(LanguageExpression::FunctionCall(FunctionCall {
                    namespace: None,
                    name: first_name,
                    arguments,
                }))
            }
            TokenKind::Dot => {
                self.advance();
                let name = self.expect(TokenKind::Identifier)?;
                if !self.check(TokenKind::LeftParenthesis) {
                    return Err(self.unexpected("'(' after namespace-qualified function name"));
                }
                let arguments = self.parse_arguments()?;
                Ok(LanguageExpression::FunctionCall(FunctionCall {
                    namespace: Some(first_name),
                    name: identifier_text(&name),
                    arguments,
                }))
            }
            _ if first_name == "true" => Ok(LanguageExpression::Literal(Literal::Boolean(true))),
            _ if first_name == "false" => Ok(LanguageExpression::Literal(Literal::Boolean(false))),
            _ => Err(syntax_error(
                format!("expected '(' after function name '{first_name}'"),
                self.peek(),
            )),
        }
    }

    /// args = "(" ( expression ( "," expression )* )? ")"
    fn parse_arguments(&mut self) -> Result<Vec<LanguageExpression>, ExpressionError> {
        self.expect(TokenKind::LeftParenthesis)?;
        let mut arguments = Vec::new();

        if self.check(TokenKind::RightParenthesis) {
            self.advance();
            return Ok(arguments);
        }

        loop {
            arguments.push(self.parse_expression()?);
            match self.peek().kind {
                TokenKind::Comma => {
                    self.advance();
                    if self.check(TokenKind::RightParenthesis) {
                        return Err(syntax_error(
                            "trailing ',' in argument list",
                            self.previous(),
                        ));
                    }
                }
                TokenKind::RightParenthesis => {
                    self.advance();
                    return Ok(arguments);
                }
                _ => return Err(self.unexpected("',' or ')'")),
            }
        }
    }
}

fn identifier_text(token: &ExpressionToken) -> String {
    token.text().unwrap_or_default().to_string()
}

fn syntax_error(message: impl Into<String>, at: &ExpressionToken) -> ExpressionError {
    ExpressionError::Syntax {
        message: message.into(),
        info: ErrorInfo::new(at.position.line, at.position.column),
    }
}

/// Parses a complete token stream into an expression.
///
/// # Errors
///
/// Returns `ExpressionError::Syntax` for any structural violation, located at
/// the offending token.
pub fn parse_tokens(tokens: &[ExpressionToken]) -> Result<LanguageExpression, ExpressionError> {
    Parser::new(tokens).parse_input()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::lexer::tokenize;
    use crate::span::LineIndex;

    fn parse(source: &str) -> Result<LanguageExpression, ExpressionError> {
        let index = LineIndex::new(source);
        let tokens = tokenize(source, 0, source.len(), &index)?;
        parse_tokens(&tokens)
    }

    fn syntax_column(source: &str) -> usize {
        match parse(source) {
            Err(ExpressionError::Syntax { info, .. }) => info.line_position,
            other => panic!("expected syntax error for {source:?}, got {other:?}"),
        }
    }

    #[test]
    fn parse_literals() {
        assert_eq!(parse("'a'").unwrap(), LanguageExpression::string("a"));
        assert_eq!(parse("42").unwrap(), LanguageExpression::integer(42));
        assert_eq!(
            parse("true").unwrap(),
            LanguageExpression::Literal(Literal::Boolean(true))
        );
    }

    #[test]
    fn parse_nested_calls() {
        let expr = parse("concat('a', toLower(parameters('b')))").unwrap();
        assert_eq!(expr.to_string(), "concat('a', toLower(parameters('b')))");
    }

    #[test]
    fn parse_empty_argument_list() {
        let expr = parse("resourceGroup()").unwrap();
        assert_eq!(expr, LanguageExpression::call("resourceGroup", vec![]));
    }

    #[test]
    fn postfix_chain_is_left_associative() {
        let expr = parse("f().b['c'].d").unwrap();
        let expected = LanguageExpression::call("f", vec![])
            .property("b")
            .index(LanguageExpression::string("c"))
            .property("d");
        assert_eq!(expr, expected);
    }

    #[test]
    fn parse_namespaced_call() {
        let expr = parse("sys.concat('a')").unwrap();
        match expr {
            LanguageExpression::FunctionCall(call) => {
                assert_eq!(call.namespace.as_deref(), Some("sys"));
                assert_eq!(call.name, "concat");
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn parenthesized_expression() {
        assert_eq!(parse("('a')").unwrap(), LanguageExpression::string("a"));
    }

    #[test]
    fn trailing_comma_is_rejected() {
        assert_eq!(syntax_column("f(1,)"), 4);
    }

    #[test]
    fn empty_argument_is_rejected() {
        assert_eq!(syntax_column("f(,1)"), 3);
    }

    #[test]
    fn missing_close_paren_points_at_end() {
        assert_eq!(syntax_column("f(1"), 4);
    }

    #[test]
    fn missing_close_bracket() {
        assert_eq!(syntax_column("f()[0"), 6);
    }

    #[test]
    fn bare_identifier_is_rejected() {
        assert_eq!(syntax_column("name"), 5);
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        assert_eq!(syntax_column("f() g()"), 5);
    }

    #[test]
    fn nesting_limit_is_inclusive() {
        let nested = |levels: usize| format!("{}1{}", "(".repeat(levels), ")".repeat(levels));
        let within = nested(MAX_NESTING_DEPTH - 1);
        assert_eq!(parse(&within).unwrap(), LanguageExpression::integer(1));

        let beyond = nested(MAX_NESTING_DEPTH);
        assert_eq!(syntax_column(&beyond), MAX_NESTING_DEPTH + 1);
    }

    #[test]
    fn sibling_arguments_do_not_accumulate_depth() {
        let source = format!("f({})", vec!["g(1)"; MAX_NESTING_DEPTH * 2].join(", "));
        assert!(parse(&source).is_ok());
    }

    #[test]
    fn empty_stream_is_rejected() {
        assert_eq!(syntax_column(""), 1);
    }
}
