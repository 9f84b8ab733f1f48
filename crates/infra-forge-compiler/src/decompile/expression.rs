//! Inverse lowering: mini-language expressions back to DSL expressions.

use std::collections::HashMap;
use std::mem;

use infra_forge_core::expression::{
    is_language_expression, parse_language_expression, FunctionCall, LanguageExpression, Literal,
};
use infra_forge_core::Span;
use infra_forge_dsl::{Expression, ExpressionKind, Identifier, NodeIds, ObjectProperty, StringSegment};

use crate::semantic::namespaces::find_function_ignore_case;

/// A resource declared in the document being decompiled.
#[derive(Debug, Clone)]
pub(super) struct ResourceEntry {
    pub symbol: String,
    pub full_type: String,
    /// Canonical mini-language text of the resource's `name` value.
    pub name_key: String,
}

/// Identifiers assigned to the document's declarations.
///
/// Parameter and variable names are case-insensitive in the target format
/// and are keyed by their lowercase form.
#[derive(Debug, Default)]
pub(super) struct Names {
    pub parameters: HashMap<String, String>,
    pub variables: HashMap<String, String>,
    pub resources: Vec<ResourceEntry>,
}

impl Names {
    fn resource_by_id(&self, arguments: &[LanguageExpression]) -> Option<&ResourceEntry> {
        let (full_type, segments) = arguments.split_first()?;
        let full_type = full_type.as_string_literal()?;
        let key = match segments {
            [] => return None,
            [single] => single.to_string(),
            _ => {
                let literal: Option<Vec<&str>> =
                    segments.iter().map(LanguageExpression::as_string_literal).collect();
                LanguageExpression::string(literal?.join("/")).to_string()
            }
        };
        self.resources
            .iter()
            .find(|r| r.full_type.eq_ignore_ascii_case(full_type) && r.name_key == key)
    }

    /// Matches the first argument of `reference(...)`.
    fn resource_by_reference(&self, target: &LanguageExpression) -> Option<&ResourceEntry> {
        if let Some(call) = target.as_call_to("resourceId") {
            return self.resource_by_id(&call.arguments);
        }
        let key = target.as_string_literal().map(|_| target.to_string())?;
        self.resources.iter().find(|r| r.name_key == key)
    }

    /// Resolves a `dependsOn` entry: a `[resourceId(...)]` expression, or a
    /// plain resource name optionally prefixed by its type.
    pub(super) fn resolve_dependency(&self, entry: &str) -> Option<&ResourceEntry> {
        if is_language_expression(entry) {
            let expression = parse_language_expression(entry, None).ok()?;
            return expression
                .as_call_to("resourceId")
                .and_then(|call| self.resource_by_id(&call.arguments));
        }
        self.resources.iter().find(|r| {
            let key = LanguageExpression::string(entry).to_string();
            let qualified = entry
                .strip_prefix(r.full_type.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .map(|name| LanguageExpression::string(name).to_string());
            r.name_key == key || qualified.as_deref() == Some(r.name_key.as_str())
        })
    }
}

/// Canonical text used to match a resource's `name` against `resourceId` arguments.
pub(super) fn name_key(name: &str) -> String {
    if is_language_expression(name) {
        if let Ok(expression) = parse_language_expression(name, None) {
            return expression.to_string();
        }
    }
    let literal = name.strip_prefix("[[").map_or(name.to_string(), |rest| format!("[{rest}"));
    LanguageExpression::string(literal).to_string()
}

/// Builds DSL expression nodes from parsed mini-language expressions.
pub(super) struct Converter<'a> {
    names: &'a Names,
    ids: &'a mut NodeIds,
}

impl<'a> Converter<'a> {
    pub(super) fn new(names: &'a Names, ids: &'a mut NodeIds) -> Self {
        Self { names, ids }
    }

    pub(super) fn node(&mut self, kind: ExpressionKind) -> Expression {
        self.ids.expression(kind, Span::default())
    }

    fn reference(&mut self, name: &str) -> Expression {
        self.node(ExpressionKind::Reference(identifier(name)))
    }

    fn property(&mut self, base: Expression, property: &str) -> Expression {
        self.node(ExpressionKind::PropertyAccess {
            base: Box::new(base),
            property: identifier(property),
        })
    }

    /// Converts one expression. The error is a reason the expression has no
    /// DSL equivalent.
    pub(super) fn convert(&mut self, expression: &LanguageExpression) -> Result<Expression, String> {
        match expression {
            LanguageExpression::Literal(literal) => {
                Ok(self.node(ExpressionKind::Literal(literal.clone())))
            }
            LanguageExpression::FunctionCall(call) => self.convert_call(call),
            LanguageExpression::PropertyAccess { base, property } => {
                let base = self.convert(base)?;
                Ok(self.property(base, property))
            }
            LanguageExpression::ArrayAccess { base, index } => {
                let base = self.convert(base)?;
                let index = self.convert(index)?;
                Ok(self.node(ExpressionKind::ArrayAccess {
                    base: Box::new(base),
                    index: Box::new(index),
                }))
            }
        }
    }

    fn convert_call(&mut self, call: &FunctionCall) -> Result<Expression, String> {
        if let Some(namespace) = &call.namespace {
            return Err(format!(
                "user-defined function '{namespace}.{}' has no equivalent",
                call.name
            ));
        }
        let arguments = call.arguments.as_slice();
        match (call.name.to_ascii_lowercase().as_str(), arguments) {
            ("parameters", [name]) => {
                let name = name.as_string_literal().ok_or("parameters() takes a literal name")?;
                let identifier = self
                    .names
                    .parameters
                    .get(&name.to_ascii_lowercase())
                    .ok_or_else(|| format!("unknown parameter '{name}'"))?;
                Ok(self.reference(&identifier.clone()))
            }
            ("variables", [name]) => {
                let name = name.as_string_literal().ok_or("variables() takes a literal name")?;
                let identifier = self
                    .names
                    .variables
                    .get(&name.to_ascii_lowercase())
                    .ok_or_else(|| format!("unknown variable '{name}'"))?;
                Ok(self.reference(&identifier.clone()))
            }
            ("resourceid", _) if self.names.resource_by_id(arguments).is_some() => {
                let symbol = self
                    .names
                    .resource_by_id(arguments)
                    .map(|r| r.symbol.clone())
                    .unwrap_or_default();
                let base = self.reference(&symbol);
                Ok(self.property(base, "id"))
            }
            ("reference", [target, rest @ ..])
                if rest.len() <= 2 && self.names.resource_by_reference(target).is_some() =>
            {
                let symbol = self
                    .names
                    .resource_by_reference(target)
                    .map(|r| r.symbol.clone())
                    .unwrap_or_default();
                let full = rest
                    .get(1)
                    .and_then(LanguageExpression::as_string_literal)
                    .is_some_and(|mode| mode.eq_ignore_ascii_case("full"));
                let base = self.reference(&symbol);
                Ok(if full { base } else { self.property(base, "properties") })
            }
            ("format", [format, values @ ..]) => match format
                .as_string_literal()
                .and_then(|text| parse_format(text, values.len()))
            {
                Some(pieces) => self.interpolate(&pieces, values),
                None => self.builtin_call(call),
            },
            ("createobject", _) if arguments.len() % 2 == 0 => {
                let mut properties: Vec<ObjectProperty> = Vec::with_capacity(arguments.len() / 2);
                for pair in arguments.chunks(2) {
                    let key = pair[0]
                        .as_string_literal()
                        .ok_or("createObject() keys must be literal strings")?;
                    if properties.iter().any(|p| p.key == key) {
                        return Err(format!("createObject() repeats the key '{key}'"));
                    }
                    let value = self.convert(&pair[1])?;
                    properties.push(ObjectProperty {
                        key: key.to_string(),
                        key_span: Span::default(),
                        value,
                    });
                }
                Ok(self.node(ExpressionKind::Object(properties)))
            }
            ("createarray", _) => {
                let items = arguments
                    .iter()
                    .map(|item| self.convert(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(self.node(ExpressionKind::Array(items)))
            }
            ("true", []) => Ok(self.node(ExpressionKind::Literal(Literal::Boolean(true)))),
            ("false", []) => Ok(self.node(ExpressionKind::Literal(Literal::Boolean(false)))),
            ("null", []) => Ok(self.node(ExpressionKind::Literal(Literal::Null))),
            _ => self.builtin_call(call),
        }
    }

    fn builtin_call(&mut self, call: &FunctionCall) -> Result<Expression, String> {
        let signature = find_function_ignore_case(&call.name)
            .ok_or_else(|| format!("function '{}' has no equivalent", call.name))?;
        if !signature.accepts(call.arguments.len()) {
            return Err(format!(
                "function '{}' expects {} argument(s) but was given {}",
                signature.name,
                signature.arity(),
                call.arguments.len()
            ));
        }
        let arguments = call
            .arguments
            .iter()
            .map(|argument| self.convert(argument))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.node(ExpressionKind::FunctionCall {
            namespace: None,
            name: identifier(signature.name),
            arguments,
        }))
    }

    fn interpolate(
        &mut self,
        pieces: &[FormatPiece],
        values: &[LanguageExpression],
    ) -> Result<Expression, String> {
        match pieces {
            [] => return Ok(self.node(ExpressionKind::Literal(Literal::String(String::new())))),
            [FormatPiece::Text(text)] => {
                return Ok(self.node(ExpressionKind::Literal(Literal::String(text.clone()))));
            }
            _ => {}
        }
        let mut segments = Vec::with_capacity(pieces.len());
        for piece in pieces {
            segments.push(match piece {
                FormatPiece::Text(text) => StringSegment::Text(text.clone()),
                // Each hole gets its own nodes, even when an index repeats.
                FormatPiece::Hole(index) => StringSegment::Expression(self.convert(&values[*index])?),
            });
        }
        Ok(self.node(ExpressionKind::Interpolated(segments)))
    }
}

fn identifier(name: &str) -> Identifier {
    Identifier::new(name, Span::default())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FormatPiece {
    Text(String),
    Hole(usize),
}

/// Splits a `format()` string into text and `{n}` holes.
///
/// Returns `None` for anything that cannot become an interpolated string:
/// unbalanced braces, format specifiers such as `{0:N}`, holes past the end
/// of `values`, or values no hole uses.
fn parse_format(format: &str, value_count: usize) -> Option<Vec<FormatPiece>> {
    let mut pieces = Vec::new();
    let mut text = String::new();
    let mut used = vec![false; value_count];
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                text.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                text.push('}');
            }
            '{' => {
                let mut digits = String::new();
                while let Some(d) = chars.next_if(char::is_ascii_digit) {
                    digits.push(d);
                }
                if chars.next() != Some('}') {
                    return None;
                }
                let index: usize = digits.parse().ok()?;
                *used.get_mut(index)? = true;
                if !text.is_empty() {
                    pieces.push(FormatPiece::Text(mem::take(&mut text)));
                }
                pieces.push(FormatPiece::Hole(index));
            }
            '}' => return None,
            _ => text.push(c),
        }
    }
    if !text.is_empty() {
        pieces.push(FormatPiece::Text(text));
    }
    used.iter().all(|u| *u).then_some(pieces)
}
