use std::collections::HashSet;

use infra_forge_core::expression::{Literal, MAX_NESTING_DEPTH};
use infra_forge_core::{LineIndex, Span};

use crate::error::DslError;
use crate::lexer::{tokenize, SpannedToken};
use crate::syntax::{
    Declaration, Expression, ExpressionKind, Identifier, NodeIds, ObjectProperty,
    OutputDeclaration, ParameterDeclaration, Program, ResourceDeclaration, ResourceTypeReference,
    StringSegment, TypeAnnotation, VariableDeclaration,
};
use crate::token::{self, Token};

/// Recursive descent parser for the infra DSL grammar.
///
/// Consumes a flat list of spanned tokens produced by the lexer. Errors are
/// collected rather than returned: a failed declaration becomes a skip node
/// and parsing resumes at the next declaration boundary.
struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    ids: NodeIds,
    errors: Vec<DslError>,
    /// Byte offset just past the parsed text.
    end: usize,
    /// Current expression nesting, capped at [`MAX_NESTING_DEPTH`].
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<SpannedToken>, end: usize, ids: NodeIds) -> Self {
        Self {
            tokens,
            pos: 0,
            ids,
            errors: Vec::new(),
            end,
            depth: 0,
        }
    }

    // -- Cursor helpers --

    fn peek(&self) -> Option<&SpannedToken> {
        self.tokens.get(self.pos)
    }

    fn peek_token(&self) -> Option<Token> {
        self.peek().map(|st| st.token)
    }

    fn peek_nth_token(&self, n: usize) -> Option<Token> {
        self.tokens.get(self.pos + n).map(|st| st.token)
    }

    fn advance(&mut self) -> Option<SpannedToken> {
        if self.pos < self.tokens.len() {
            let tok = self.tokens[self.pos].clone();
            self.pos += 1;
            Some(tok)
        } else {
            None
        }
    }

    fn expect(&mut self, expected: Token) -> Result<SpannedToken, DslError> {
        if self.peek_token() == Some(expected) {
            self.advance()
                .ok_or_else(|| self.unexpected(expected.description()))
        } else {
            Err(self.unexpected(expected.description()))
        }
    }

    fn unexpected(&self, expected: &str) -> DslError {
        match self.peek() {
            Some(st) => DslError::UnexpectedToken {
                expected: expected.to_string(),
                found: describe(st),
                span: st.span,
            },
            None => DslError::UnexpectedEndOfInput {
                expected: expected.to_string(),
                span: Span::new(self.end, self.end),
            },
        }
    }

    fn current_span(&self) -> Span {
        self.peek()
            .map(|st| st.span)
            .unwrap_or(Span::new(self.end, self.end))
    }

    fn skip_newlines(&mut self) {
        while self.peek_token() == Some(Token::Newline) {
            self.advance();
        }
    }

    /// Skips newlines and commas between object properties or array items.
    fn skip_separators(&mut self) {
        while matches!(self.peek_token(), Some(Token::Newline | Token::Comma)) {
            self.advance();
        }
    }

    fn at_line_start(&self) -> bool {
        self.pos == 0 || self.tokens[self.pos - 1].token == Token::Newline
    }

    // -- Recovery --

    /// Skips to the end of the current statement and returns the end offset
    /// of the skipped region.
    ///
    /// Stops at a newline outside any brackets, or at a declaration keyword
    /// that starts a line and is followed by a name. The first token is always
    /// consumed. A closer only balances the opener it matches; stray closers
    /// are skipped along with the rest of the region.
    fn recover_to_next_declaration(&mut self) -> usize {
        let mut open: Vec<Token> = Vec::new();
        let mut end = self.current_span().start;
        let mut first = true;
        while let Some(st) = self.peek() {
            let token = st.token;
            let span_end = st.span.end;
            match token {
                Token::Newline if open.is_empty() => break,
                t if t.is_declaration_keyword()
                    && !first
                    && self.at_line_start()
                    && self.peek_nth_token(1) == Some(Token::Ident) =>
                {
                    break
                }
                Token::LBrace => open.push(Token::RBrace),
                Token::LBracket => open.push(Token::RBracket),
                Token::LParen => open.push(Token::RParen),
                Token::RBrace | Token::RBracket | Token::RParen => {
                    // Openers left unclosed inside the matched pair are dropped.
                    if let Some(at) = open.iter().rposition(|&closer| closer == token) {
                        open.truncate(at);
                    }
                }
                _ => {}
            }
            first = false;
            end = span_end;
            self.advance();
        }
        end
    }

    /// Abandons a failed statement: drops errors recorded since `mark`, keeps
    /// `err` as the one diagnostic for the region and skips past it.
    fn abandon(&mut self, err: DslError, mark: usize, start_pos: usize, depth: usize) -> usize {
        self.errors.truncate(mark);
        self.errors.push(err);
        self.pos = start_pos;
        self.depth = depth;
        self.recover_to_next_declaration()
    }

    // -- Grammar productions --

    /// program = ( NEWLINE* declaration ( NEWLINE | EOF ) )*
    fn parse_program(&mut self) -> Vec<Declaration> {
        let mut declarations = Vec::new();
        loop {
            self.skip_newlines();
            if self.peek().is_none() {
                break;
            }
            declarations.push(self.parse_declaration());
        }
        declarations
    }

    fn parse_declaration(&mut self) -> Declaration {
        let start_pos = self.pos;
        let mark = self.errors.len();
        let start = self.current_span().start;
        let result = match self.peek_token() {
            Some(Token::Parameter) => self.parse_parameter().map(Declaration::Parameter),
            Some(Token::Variable) => self.parse_variable().map(Declaration::Variable),
            Some(Token::Resource) => self.parse_resource().map(Declaration::Resource),
            Some(Token::Output) => self.parse_output().map(Declaration::Output),
            _ => Err(self.unexpected(
                "declaration ('parameter', 'variable', 'resource' or 'output')",
            )),
        };

        match result {
            Ok(declaration) => {
                self.finish_statement();
                declaration
            }
            Err(err) => {
                let end = self.abandon(err, mark, start_pos, 0);
                Declaration::Skipped(Span::new(start, end))
            }
        }
    }

    /// Consumes the newline ending a declaration, reporting anything else on the line once.
    fn finish_statement(&mut self) {
        match self.peek_token() {
            None => {}
            Some(Token::Newline) => {
                self.advance();
            }
            // Recovery inside the body already stopped at the next declaration.
            Some(_) if self.at_line_start() => {}
            Some(_) => {
                let err = self.unexpected("newline after declaration");
                self.errors.push(err);
                self.recover_to_next_declaration();
            }
        }
    }

    /// parameter_decl = "parameter" IDENT ":" type ( "=" expression )?
    fn parse_parameter(&mut self) -> Result<ParameterDeclaration, DslError> {
        let keyword = self.expect(Token::Parameter)?;
        let name = self.expect_name("parameter name")?;
        self.expect(Token::Colon)?;
        let type_annotation = self.parse_type_annotation()?;

        let default_value = if self.peek_token() == Some(Token::Equals) {
            self.advance();
            Some(self.parse_body())
        } else {
            None
        };

        let end = default_value
            .as_ref()
            .map(|e| e.span.end)
            .unwrap_or(type_annotation.span.end);
        Ok(ParameterDeclaration {
            name,
            type_annotation,
            default_value,
            span: Span::new(keyword.span.start, end),
        })
    }

    /// variable_decl = "variable" IDENT "=" expression
    fn parse_variable(&mut self) -> Result<VariableDeclaration, DslError> {
        let keyword = self.expect(Token::Variable)?;
        let name = self.expect_name("variable name")?;
        self.expect(Token::Equals)?;
        let value = self.parse_body();
        Ok(VariableDeclaration {
            span: Span::new(keyword.span.start, value.span.end),
            name,
            value,
        })
    }

    /// resource_decl = "resource" IDENT ":" STRING "=" expression
    fn parse_resource(&mut self) -> Result<ResourceDeclaration, DslError> {
        let keyword = self.expect(Token::Resource)?;
        let name = self.expect_name("resource name")?;
        self.expect(Token::Colon)?;

        let type_tok = self.expect(Token::StringLiteral)?;
        let text = match self.decode_string(&type_tok)? {
            ExpressionKind::Literal(Literal::String(text)) => text,
            _ => {
                return Err(DslError::InterpolatedResourceType {
                    span: type_tok.span,
                })
            }
        };
        let resource_type = ResourceTypeReference {
            text,
            span: type_tok.span,
        };

        self.expect(Token::Equals)?;
        let body = self.parse_body();
        Ok(ResourceDeclaration {
            span: Span::new(keyword.span.start, body.span.end),
            name,
            resource_type,
            body,
        })
    }

    /// output_decl = "output" IDENT ( ":" type )? "=" expression
    fn parse_output(&mut self) -> Result<OutputDeclaration, DslError> {
        let keyword = self.expect(Token::Output)?;
        let name = self.expect_name("output name")?;

        let type_annotation = if self.peek_token() == Some(Token::Colon) {
            self.advance();
            Some(self.parse_type_annotation()?)
        } else {
            None
        };

        self.expect(Token::Equals)?;
        let value = self.parse_body();
        Ok(OutputDeclaration {
            span: Span::new(keyword.span.start, value.span.end),
            name,
            type_annotation,
            value,
        })
    }

    /// type = IDENT
    fn parse_type_annotation(&mut self) -> Result<TypeAnnotation, DslError> {
        let tok = self.expect_token(Token::Ident, "type name")?;
        Ok(TypeAnnotation {
            name: tok.text,
            span: tok.span,
        })
    }

    /// Parses a declaration body. On failure the error is recorded, the rest
    /// of the statement is skipped, and a skip node stands in for the body.
    fn parse_body(&mut self) -> Expression {
        let start_pos = self.pos;
        let mark = self.errors.len();
        let depth = self.depth;
        let start = self.current_span().start;
        match self.parse_expression() {
            Ok(expression) => expression,
            Err(err) => {
                let end = self.abandon(err, mark, start_pos, depth).max(start);
                self.ids
                    .expression(ExpressionKind::Skipped, Span::new(start, end))
            }
        }
    }

    /// Counts one level of nesting. Each postfix link is a level too.
    fn descend(&mut self) -> Result<(), DslError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(DslError::NestingTooDeep {
                limit: MAX_NESTING_DEPTH,
                span: self.current_span(),
            });
        }
        self.depth += 1;
        Ok(())
    }

    /// expression = primary ( "." IDENT | "[" expression "]" )*
    fn parse_expression(&mut self) -> Result<Expression, DslError> {
        let outer = self.depth;
        self.descend()?;
        let mut expression = self.parse_primary()?;
        loop {
            match self.peek_token() {
                Some(Token::Dot) => {
                    self.descend()?;
                    self.advance();
                    let property = self.expect_property_identifier()?;
                    let span = expression.span.to(property.span);
                    expression = self.ids.expression(
                        ExpressionKind::PropertyAccess {
                            base: Box::new(expression),
                            property,
                        },
                        span,
                    );
                }
                Some(Token::LBracket) => {
                    self.descend()?;
                    self.advance();
                    self.skip_newlines();
                    let index = self.parse_expression()?;
                    self.skip_newlines();
                    let close = self.expect(Token::RBracket)?;
                    let span = expression.span.to(close.span);
                    expression = self.ids.expression(
                        ExpressionKind::ArrayAccess {
                            base: Box::new(expression),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                _ => {
                    self.depth = outer;
                    return Ok(expression);
                }
            }
        }
    }

    /// primary = literal | STRING | call | namespaced_call | IDENT
    ///         | "(" expression ")" | object | array
    fn parse_primary(&mut self) -> Result<Expression, DslError> {
        let Some(token) = self.peek_token() else {
            return Err(self.unexpected("expression"));
        };

        match token {
            Token::True | Token::False | Token::Null => {
                let tok = self.advance().ok_or_else(|| self.unexpected("expression"))?;
                let literal = match tok.token {
                    Token::True => Literal::Boolean(true),
                    Token::False => Literal::Boolean(false),
                    _ => Literal::Null,
                };
                Ok(self.ids.expression(ExpressionKind::Literal(literal), tok.span))
            }
            Token::IntegerLiteral => {
                let tok = self.advance().ok_or_else(|| self.unexpected("expression"))?;
                let value = parse_i64(&tok.text, tok.span)?;
                Ok(self
                    .ids
                    .expression(ExpressionKind::Literal(Literal::Integer(value)), tok.span))
            }
            Token::StringLiteral => {
                let tok = self.advance().ok_or_else(|| self.unexpected("expression"))?;
                let kind = self.decode_string(&tok)?;
                Ok(self.ids.expression(kind, tok.span))
            }
            Token::Ident => self.parse_identifier_expression(),
            Token::LParen => {
                self.advance();
                self.skip_newlines();
                let inner = self.parse_expression()?;
                self.skip_newlines();
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::LBrace => self.parse_object(),
            Token::LBracket => self.parse_array(),
            _ => Err(self.unexpected("expression")),
        }
    }

    /// IDENT "(" args ")" | IDENT "." IDENT "(" args ")" | IDENT
    fn parse_identifier_expression(&mut self) -> Result<Expression, DslError> {
        let first = self.expect_identifier("identifier")?;

        if self.peek_token() == Some(Token::LParen) {
            let (arguments, close) = self.parse_arguments()?;
            let span = first.span.to(close);
            return Ok(self.ids.expression(
                ExpressionKind::FunctionCall {
                    namespace: None,
                    name: first,
                    arguments,
                },
                span,
            ));
        }

        if self.peek_token() == Some(Token::Dot)
            && self.peek_nth_token(1) == Some(Token::Ident)
            && self.peek_nth_token(2) == Some(Token::LParen)
        {
            self.advance();
            let name = self.expect_identifier("function name")?;
            let (arguments, close) = self.parse_arguments()?;
            let span = first.span.to(close);
            return Ok(self.ids.expression(
                ExpressionKind::FunctionCall {
                    namespace: Some(first),
                    name,
                    arguments,
                },
                span,
            ));
        }

        let span = first.span;
        Ok(self.ids.expression(ExpressionKind::Reference(first), span))
    }

    /// args = "(" ( expression ( "," expression )* )? ")"
    ///
    /// Newlines are insignificant inside the parentheses.
    fn parse_arguments(&mut self) -> Result<(Vec<Expression>, Span), DslError> {
        self.expect(Token::LParen)?;
        let mut arguments = Vec::new();
        self.skip_newlines();

        if self.peek_token() == Some(Token::RParen) {
            let close = self.expect(Token::RParen)?;
            return Ok((arguments, close.span));
        }

        loop {
            arguments.push(self.parse_expression()?);
            self.skip_newlines();
            match self.peek_token() {
                Some(Token::Comma) => {
                    let comma = self.expect(Token::Comma)?;
                    self.skip_newlines();
                    if self.peek_token() == Some(Token::RParen) {
                        return Err(DslError::TrailingComma { span: comma.span });
                    }
                }
                Some(Token::RParen) => {
                    let close = self.expect(Token::RParen)?;
                    return Ok((arguments, close.span));
                }
                _ => return Err(self.unexpected("',' or ')'")),
            }
        }
    }

    /// object = "{" separator* ( property ( separator+ property )* separator* )? "}"
    /// property = key ":" expression
    fn parse_object(&mut self) -> Result<Expression, DslError> {
        let open = self.expect(Token::LBrace)?;
        let mut properties = Vec::new();
        let mut seen = HashSet::new();

        self.skip_separators();
        while !matches!(self.peek_token(), Some(Token::RBrace) | None) {
            let (key, key_span) = self.parse_property_key()?;
            self.expect(Token::Colon)?;
            let value = self.parse_expression()?;

            if seen.insert(key.clone()) {
                properties.push(ObjectProperty {
                    key,
                    key_span,
                    value,
                });
            } else {
                self.errors.push(DslError::DuplicatePropertyKey {
                    key,
                    span: key_span,
                });
            }

            match self.peek_token() {
                Some(Token::Newline | Token::Comma) => self.skip_separators(),
                Some(Token::RBrace) => {}
                _ => return Err(self.unexpected("newline, ',' or '}'")),
            }
        }

        let close = self.expect(Token::RBrace)?;
        Ok(self
            .ids
            .expression(ExpressionKind::Object(properties), open.span.to(close.span)))
    }

    /// key = IDENT | keyword | STRING
    fn parse_property_key(&mut self) -> Result<(String, Span), DslError> {
        match self.peek_token() {
            Some(t) if t == Token::Ident || t.is_keyword() => {
                let tok = self.advance().ok_or_else(|| self.unexpected("property name"))?;
                Ok((tok.text, tok.span))
            }
            Some(Token::StringLiteral) => {
                let tok = self.advance().ok_or_else(|| self.unexpected("property name"))?;
                match self.decode_string(&tok)? {
                    ExpressionKind::Literal(Literal::String(key)) => Ok((key, tok.span)),
                    _ => Err(DslError::UnexpectedToken {
                        expected: "property name".to_string(),
                        found: "interpolated string".to_string(),
                        span: tok.span,
                    }),
                }
            }
            _ => Err(self.unexpected("property name")),
        }
    }

    /// array = "[" separator* ( expression ( separator+ expression )* separator* )? "]"
    fn parse_array(&mut self) -> Result<Expression, DslError> {
        let open = self.expect(Token::LBracket)?;
        let mut items = Vec::new();

        self.skip_separators();
        while !matches!(self.peek_token(), Some(Token::RBracket) | None) {
            items.push(self.parse_expression()?);
            match self.peek_token() {
                Some(Token::Newline | Token::Comma) => self.skip_separators(),
                Some(Token::RBracket) => {}
                _ => return Err(self.unexpected("newline, ',' or ']'")),
            }
        }

        let close = self.expect(Token::RBracket)?;
        Ok(self
            .ids
            .expression(ExpressionKind::Array(items), open.span.to(close.span)))
    }

    // -- Strings --

    /// Decodes a string token into a literal or an interpolated string.
    ///
    /// Invalid escapes are recorded and the character kept, so the token
    /// still produces a value.
    fn decode_string(&mut self, tok: &SpannedToken) -> Result<ExpressionKind, DslError> {
        let body = tok
            .text
            .strip_prefix('\'')
            .and_then(|s| s.strip_suffix('\''))
            .ok_or_else(|| DslError::UnexpectedToken {
                expected: "string literal".to_string(),
                found: tok.text.clone(),
                span: tok.span,
            })?;
        let base = tok.span.start + 1;

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = body.char_indices().peekable();

        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, '\'')) => current.push('\''),
                    Some((_, '\\')) => current.push('\\'),
                    Some((_, 'n')) => current.push('\n'),
                    Some((_, 'r')) => current.push('\r'),
                    Some((_, 't')) => current.push('\t'),
                    Some((_, '$')) => current.push('$'),
                    Some((j, other)) => {
                        self.errors.push(DslError::InvalidEscape {
                            sequence: format!("\\{other}"),
                            span: Span::new(base + i, base + j + other.len_utf8()),
                        });
                        current.push(other);
                    }
                    None => current.push('\\'),
                },
                '$' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    let hole_start = i + 2;
                    let hole_end = token::hole_end(body, hole_start).ok_or(
                        DslError::UnexpectedEndOfInput {
                            expected: "'}' closing interpolation".to_string(),
                            span: Span::new(base + body.len(), base + body.len()),
                        },
                    )?;
                    while matches!(chars.peek(), Some(&(k, _)) if k < hole_end) {
                        chars.next();
                    }

                    if !current.is_empty() {
                        segments.push(StringSegment::Text(std::mem::take(&mut current)));
                    }
                    let hole_span = Span::new(base + i, base + hole_end);
                    let inner = &body[hole_start..hole_end - 1];
                    let expression = self.parse_hole(inner, base + hole_start, hole_span)?;
                    segments.push(StringSegment::Expression(expression));
                }
                _ => current.push(c),
            }
        }

        if segments.is_empty() {
            return Ok(ExpressionKind::Literal(Literal::String(current)));
        }
        if !current.is_empty() {
            segments.push(StringSegment::Text(current));
        }
        Ok(ExpressionKind::Interpolated(segments))
    }

    /// Parses the text of one `${...}` hole. `offset` is where `text` starts in the source.
    fn parse_hole(
        &mut self,
        text: &str,
        offset: usize,
        hole_span: Span,
    ) -> Result<Expression, DslError> {
        if text.trim().is_empty() {
            return Err(DslError::EmptyInterpolation { span: hole_span });
        }

        let (mut tokens, lex_errors) = tokenize(text);
        for tok in &mut tokens {
            tok.span = tok.span.shifted(offset);
        }
        self.errors
            .extend(lex_errors.into_iter().map(|e| e.shifted(offset)));

        let mut inner = Parser::new(tokens, offset + text.len(), std::mem::take(&mut self.ids));
        inner.depth = self.depth;
        let result = inner.parse_expression().and_then(|expression| {
            if inner.peek().is_some() {
                Err(inner.unexpected("'}' closing interpolation"))
            } else {
                Ok(expression)
            }
        });
        self.ids = inner.ids;
        self.errors.extend(inner.errors);
        result
    }

    // -- Token expectation helpers --

    fn expect_token(&mut self, expected: Token, context: &str) -> Result<SpannedToken, DslError> {
        if self.peek_token() == Some(expected) {
            self.advance().ok_or_else(|| self.unexpected(context))
        } else {
            Err(self.unexpected(context))
        }
    }

    fn expect_identifier(&mut self, context: &str) -> Result<Identifier, DslError> {
        let tok = self.expect_token(Token::Ident, context)?;
        Ok(Identifier::new(tok.text, tok.span))
    }

    /// Like [`Self::expect_identifier`], but a keyword is reported as a reserved word.
    fn expect_name(&mut self, context: &str) -> Result<Identifier, DslError> {
        match self.peek() {
            Some(st) if st.token.is_keyword() => Err(DslError::KeywordAsName {
                keyword: st.text.clone(),
                span: st.span,
            }),
            _ => self.expect_identifier(context),
        }
    }

    /// Property names after `.` may be keywords, as object keys may.
    fn expect_property_identifier(&mut self) -> Result<Identifier, DslError> {
        match self.peek_token() {
            Some(t) if t == Token::Ident || t.is_keyword() => {
                let tok = self.advance().ok_or_else(|| self.unexpected("property name"))?;
                Ok(Identifier::new(tok.text, tok.span))
            }
            _ => Err(self.unexpected("property name")),
        }
    }
}

fn describe(st: &SpannedToken) -> String {
    match st.token {
        Token::Newline => st.token.description().to_string(),
        _ => format!("{} ('{}')", st.token.description(), st.text),
    }
}

fn parse_i64(text: &str, span: Span) -> Result<i64, DslError> {
    text.parse::<i64>()
        .map_err(|_| DslError::InvalidIntegerLiteral {
            text: text.to_string(),
            span,
        })
}

/// Parse DSL source text into a program.
///
/// Never fails: lexical and syntax errors are recorded on
/// [`Program::diagnostics`], ordered by position, and the declarations they
/// affect are replaced by skip nodes.
pub fn parse(source: &str) -> Program {
    let (tokens, lex_errors) = tokenize(source);
    let mut parser = Parser::new(tokens, source.len(), NodeIds::new());
    let declarations = parser.parse_program();

    let mut errors = lex_errors;
    errors.extend(parser.errors);
    errors.sort_by_key(|e| e.span().start);

    let line_index = LineIndex::new(source);
    let diagnostics: Vec<_> = errors.iter().map(|e| e.to_diagnostic(&line_index)).collect();

    tracing::debug!(
        declarations = declarations.len(),
        diagnostics = diagnostics.len(),
        "parsed program"
    );

    Program {
        declarations,
        diagnostics,
        line_index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- Helpers --

    fn parse_clean(source: &str) -> Program {
        let program = parse(source);
        assert!(
            program.diagnostics.is_empty(),
            "unexpected diagnostics: {:?}",
            program.diagnostics
        );
        program
    }

    fn parse_one(source: &str) -> Declaration {
        let program = parse_clean(source);
        assert_eq!(program.declarations.len(), 1, "expected exactly one declaration");
        program.declarations.into_iter().next().unwrap()
    }

    fn variable_value(source: &str) -> Expression {
        match parse_one(source) {
            Declaration::Variable(v) => v.value,
            other => panic!("expected variable, got {other:?}"),
        }
    }

    fn messages(source: &str) -> Vec<String> {
        parse(source)
            .diagnostics
            .into_iter()
            .map(|d| d.message)
            .collect()
    }

    // -- Declarations --

    #[test]
    fn parse_parameter() {
        match parse_one("parameter name: string") {
            Declaration::Parameter(p) => {
                assert_eq!(p.name.name, "name");
                assert_eq!(p.type_annotation.name, "string");
                assert!(p.default_value.is_none());
                assert_eq!(p.span, Span::new(0, 22));
            }
            other => panic!("expected parameter, got {other:?}"),
        }
    }

    #[test]
    fn parse_parameter_with_default() {
        match parse_one("parameter location: string = 'westus'") {
            Declaration::Parameter(p) => {
                let default = p.default_value.expect("default");
                assert_eq!(default.as_string_literal(), Some("westus"));
            }
            other => panic!("expected parameter, got {other:?}"),
        }
    }

    #[test]
    fn parse_resource() {
        let source = "resource storage: 'Microsoft.Storage/storageAccounts@2019-06-01' = {\n  name: 'store'\n  location: location\n}";
        match parse_one(source) {
            Declaration::Resource(r) => {
                assert_eq!(r.name.name, "storage");
                assert_eq!(
                    r.resource_type.split(),
                    Some(("Microsoft.Storage/storageAccounts", "2019-06-01"))
                );
                let keys: Vec<_> = r.body.as_object().unwrap().iter().map(|p| p.key.as_str()).collect();
                assert_eq!(keys, vec!["name", "location"]);
            }
            other => panic!("expected resource, got {other:?}"),
        }
    }

    #[test]
    fn parse_output_with_and_without_type() {
        let program = parse_clean("output a: string = 'x'\noutput b = a");
        match &program.declarations[..] {
            [Declaration::Output(a), Declaration::Output(b)] => {
                assert_eq!(a.type_annotation.as_ref().unwrap().name, "string");
                assert!(b.type_annotation.is_none());
            }
            other => panic!("expected two outputs, got {other:?}"),
        }
    }

    #[test]
    fn blank_lines_and_comments_between_declarations() {
        let program = parse_clean(
            "// header\n\nparameter a: int\n\n/* block\ncomment */\nvariable b = a\n\n",
        );
        assert_eq!(program.declarations.len(), 2);
    }

    // -- Expressions --

    #[test]
    fn parse_function_call() {
        let value = variable_value("variable g = concat('hello ', name)");
        match value.kind {
            ExpressionKind::FunctionCall {
                namespace,
                name,
                arguments,
            } => {
                assert!(namespace.is_none());
                assert_eq!(name.name, "concat");
                assert_eq!(arguments.len(), 2);
                assert!(matches!(&arguments[1].kind, ExpressionKind::Reference(id) if id.name == "name"));
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn parse_namespaced_call() {
        let value = variable_value("variable g = sys.concat('a')");
        assert!(matches!(
            value.kind,
            ExpressionKind::FunctionCall { namespace: Some(ref ns), .. } if ns.name == "sys"
        ));
    }

    #[test]
    fn property_chain_is_not_a_namespace_call() {
        let value = variable_value("variable e = storage.properties.primaryEndpoints");
        match value.kind {
            ExpressionKind::PropertyAccess { base, property } => {
                assert_eq!(property.name, "primaryEndpoints");
                assert!(matches!(base.kind, ExpressionKind::PropertyAccess { .. }));
            }
            other => panic!("expected property access, got {other:?}"),
        }
    }

    #[test]
    fn parse_index_access() {
        let value = variable_value("variable e = items[0].name");
        match value.kind {
            ExpressionKind::PropertyAccess { base, .. } => {
                assert!(matches!(base.kind, ExpressionKind::ArrayAccess { .. }));
            }
            other => panic!("expected property access, got {other:?}"),
        }
    }

    #[test]
    fn arguments_may_span_lines() {
        let value = variable_value("variable g = concat(\n  'a',\n  'b'\n)");
        assert!(matches!(
            value.kind,
            ExpressionKind::FunctionCall { ref arguments, .. } if arguments.len() == 2
        ));
    }

    #[test]
    fn parse_object_and_array_literals() {
        let value = variable_value("variable o = {\n  a: 1\n  b: [\n    true\n    null\n  ]\n  'c-d': 'x', e: {}\n}");
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 4);
        assert_eq!(object[2].key, "c-d");
        match &object[1].value.kind {
            ExpressionKind::Array(items) => assert_eq!(items.len(), 2),
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn keywords_are_valid_object_keys() {
        let value = variable_value("variable o = { output: 1, parameter: 2 }");
        assert_eq!(value.as_object().unwrap()[0].key, "output");
    }

    #[test]
    fn parse_string_escapes() {
        let value = variable_value(r"variable s = 'it\'s\n\t\\ \$5'");
        assert_eq!(value.as_string_literal(), Some("it's\n\t\\ $5"));
    }

    #[test]
    fn parse_interpolation() {
        let value = variable_value("variable s = 'pre${name}mid${concat('}', x)}'");
        match value.kind {
            ExpressionKind::Interpolated(segments) => {
                assert_eq!(segments.len(), 4);
                assert!(matches!(&segments[0], StringSegment::Text(t) if t == "pre"));
                assert!(matches!(&segments[1], StringSegment::Expression(e)
                    if matches!(&e.kind, ExpressionKind::Reference(id) if id.name == "name")));
                assert!(matches!(&segments[2], StringSegment::Text(t) if t == "mid"));
            }
            other => panic!("expected interpolation, got {other:?}"),
        }
    }

    #[test]
    fn interpolation_spans_point_into_source() {
        let program = parse_clean("variable s = 'a${name}'");
        let Declaration::Variable(v) = &program.declarations[0] else {
            panic!("expected variable");
        };
        let ExpressionKind::Interpolated(segments) = &v.value.kind else {
            panic!("expected interpolation");
        };
        let StringSegment::Expression(e) = &segments[1] else {
            panic!("expected hole");
        };
        assert_eq!(e.span, Span::new(17, 21));
    }

    #[test]
    fn node_ids_are_unique() {
        let program = parse_clean("variable a = f(g(1), 'x${y}')\nvariable b = [a, a]");
        let mut ids = HashSet::new();
        for declaration in &program.declarations {
            declaration.body().unwrap().walk(&mut |e| {
                assert!(ids.insert(e.id), "duplicate id {:?}", e.id);
            });
        }
        assert_eq!(ids.len(), 8);
    }

    // -- Error handling --

    #[test]
    fn error_trailing_comma_in_arguments() {
        let msgs = messages("variable g = concat('a',)");
        assert_eq!(msgs, vec!["trailing ',' in argument list".to_string()]);
    }

    #[test]
    fn error_keyword_as_name() {
        let msgs = messages("variable output = 1");
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("reserved word"));
    }

    #[test]
    fn error_duplicate_object_key() {
        let program = parse("variable o = { a: 1, a: 2 }");
        assert_eq!(program.diagnostics.len(), 1);
        assert!(program.diagnostics[0].message.contains("duplicate property 'a'"));
        let Declaration::Variable(v) = &program.declarations[0] else {
            panic!("expected variable");
        };
        assert_eq!(v.value.as_object().unwrap().len(), 1);
    }

    #[test]
    fn error_invalid_escape() {
        let program = parse(r"variable s = 'a\qb'");
        assert_eq!(program.diagnostics.len(), 1);
        assert!(program.diagnostics[0].message.contains("invalid escape"));
        assert_eq!(program.diagnostics[0].column, 16);
    }

    #[test]
    fn error_empty_interpolation() {
        let msgs = messages("variable s = 'a${}'");
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("empty interpolation"));
    }

    #[test]
    fn error_integer_overflow() {
        let msgs = messages("variable n = 99999999999999999999");
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("does not fit"));
    }

    #[test]
    fn header_error_produces_skip_node_and_parsing_continues() {
        let program = parse("variable = 1\nparameter p: string\nvariable ok = p");
        assert_eq!(program.diagnostics.len(), 1);
        assert_eq!(program.diagnostics[0].line, 1);
        assert!(matches!(program.declarations[0], Declaration::Skipped(_)));
        assert!(matches!(program.declarations[1], Declaration::Parameter(_)));
        assert!(matches!(program.declarations[2], Declaration::Variable(_)));
    }

    #[test]
    fn body_error_keeps_declaration_name() {
        let program = parse("variable a = f(\nvariable b = 1");
        assert_eq!(program.diagnostics.len(), 1);
        match &program.declarations[..] {
            [Declaration::Variable(a), Declaration::Variable(b)] => {
                assert_eq!(a.name.name, "a");
                assert!(matches!(a.value.kind, ExpressionKind::Skipped));
                assert_eq!(b.name.name, "b");
            }
            other => panic!("unexpected declarations: {other:?}"),
        }
    }

    #[test]
    fn one_diagnostic_per_skipped_region() {
        let program = parse("variable a = {\n  x: : :\n  y: 2\n}\nvariable b = 2");
        assert_eq!(program.diagnostics.len(), 1);
        assert_eq!(program.declarations.len(), 2);
    }

    #[test]
    fn stray_closer_inside_object_stays_in_one_region() {
        let program = parse("variable x = {\n  a: 1\n  a: 2\n  b: )\n}\nvariable y = 1");
        assert_eq!(program.diagnostics.len(), 1, "{:?}", program.diagnostics);
        assert_eq!((program.diagnostics[0].line, program.diagnostics[0].column), (4, 6));
        match &program.declarations[..] {
            [Declaration::Variable(x), Declaration::Variable(y)] => {
                assert!(matches!(x.value.kind, ExpressionKind::Skipped));
                assert_eq!(y.name.name, "y");
            }
            other => panic!("unexpected declarations: {other:?}"),
        }
    }

    #[test]
    fn unclosed_bracket_inside_object_recovers_at_brace() {
        let program = parse("variable x = {\n  a: [1, 2\n}\noutput o = 1");
        assert_eq!(program.diagnostics.len(), 1, "{:?}", program.diagnostics);
        assert!(matches!(program.declarations[1], Declaration::Output(_)));
    }

    #[test]
    fn nesting_limit_is_inclusive() {
        let nested = |levels: usize| {
            format!("variable x = {}1{}", "(".repeat(levels), ")".repeat(levels))
        };
        parse_clean(&nested(MAX_NESTING_DEPTH - 1));

        let msgs = messages(&nested(MAX_NESTING_DEPTH));
        assert_eq!(msgs, vec![format!("expression nesting exceeds {MAX_NESTING_DEPTH} levels")]);
    }

    #[test]
    fn interpolation_holes_share_the_nesting_budget() {
        let inner = format!("{}1{}", "(".repeat(MAX_NESTING_DEPTH), ")".repeat(MAX_NESTING_DEPTH));
        let msgs = messages(&format!("variable s = '${{{inner}}}'"));
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("nesting"));
    }

    #[test]
    fn trailing_tokens_on_declaration_line() {
        let program = parse("variable a = 1 2 3\nvariable b = 2");
        assert_eq!(program.diagnostics.len(), 1);
        assert!(program.diagnostics[0].message.contains("newline after declaration"));
        assert_eq!(program.declarations.len(), 2);
    }

    #[test]
    fn stray_tokens_at_top_level() {
        let program = parse("hello world\noutput o = 1");
        assert_eq!(program.diagnostics.len(), 1);
        assert!(matches!(program.declarations[0], Declaration::Skipped(_)));
        assert!(matches!(program.declarations[1], Declaration::Output(_)));
    }

    #[test]
    fn lexical_errors_are_diagnostics() {
        let program = parse("variable a = 1 # 2\nvariable b = 'open\nvariable c = 3");
        assert!(program.has_errors());
        assert!(program
            .diagnostics
            .iter()
            .any(|d| d.message == "unrecognized character"));
        assert!(program
            .diagnostics
            .iter()
            .any(|d| d.message == "unterminated string literal"));
        assert!(program
            .named_declarations()
            .any(|d| d.name().map(|n| n.name.as_str()) == Some("c")));
    }

    #[test]
    fn unexpected_end_of_input() {
        let program = parse("output o =");
        assert_eq!(program.diagnostics.len(), 1);
        assert!(program.diagnostics[0].message.contains("unexpected end of input"));
    }

    #[test]
    fn interpolated_resource_type_is_rejected() {
        let msgs = messages("resource r: 'a/${t}@1' = {}");
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("resource type"));
    }

    #[test]
    fn diagnostics_are_ordered_by_position() {
        let program = parse("variable a = 'x\\q'\nvariable = 1\nvariable b = #");
        let lines: Vec<_> = program.diagnostics.iter().map(|d| d.line).collect();
        let mut sorted = lines.clone();
        sorted.sort();
        assert_eq!(lines, sorted);
    }
}
