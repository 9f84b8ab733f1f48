//! Lowering of DSL expressions to target-format values and mini-language
//! expressions.

use infra_forge_core::expression::{check_limit, LanguageExpression, Literal};
use infra_forge_dsl::{Declaration, Expression, ExpressionKind, StringSegment};
use serde_json::{Map, Value};

use super::EmitError;
use crate::semantic::{SemanticModel, Symbol};

pub(super) struct Lowering<'m> {
    model: &'m SemanticModel,
}

impl<'m> Lowering<'m> {
    pub(super) fn new(model: &'m SemanticModel) -> Self {
        Self { model }
    }

    /// Lowers an expression in JSON value position. Literals, objects and
    /// arrays stay JSON; anything computed becomes a `[...]` expression string.
    pub(super) fn value(&self, expression: &Expression, path: &str) -> Result<Value, EmitError> {
        match &expression.kind {
            ExpressionKind::Literal(Literal::String(text)) => Ok(Value::String(escape_literal(text))),
            ExpressionKind::Literal(Literal::Integer(n)) => Ok(Value::from(*n)),
            ExpressionKind::Literal(Literal::Boolean(b)) => Ok(Value::Bool(*b)),
            ExpressionKind::Literal(Literal::Null) | ExpressionKind::Skipped => Ok(Value::Null),
            ExpressionKind::Object(properties) => {
                let mut map = Map::new();
                for property in properties {
                    let value = self.value(&property.value, &format!("{path}.{}", property.key))?;
                    map.insert(property.key.clone(), value);
                }
                Ok(Value::Object(map))
            }
            ExpressionKind::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.value(item, &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            _ => template_string(&self.expression(expression), path).map(Value::String),
        }
    }

    /// Lowers an expression in mini-language position.
    pub(super) fn expression(&self, expression: &Expression) -> LanguageExpression {
        match &expression.kind {
            ExpressionKind::Literal(literal) => LanguageExpression::Literal(literal.clone()),
            ExpressionKind::Reference(identifier) => match self.model.binding(expression.id) {
                Some(Symbol::Parameter(_)) => {
                    LanguageExpression::call("parameters", vec![LanguageExpression::string(&identifier.name)])
                }
                Some(Symbol::Variable(_)) => {
                    LanguageExpression::call("variables", vec![LanguageExpression::string(&identifier.name)])
                }
                Some(Symbol::Resource(resource)) => self.resource_reference(resource.declaration),
                _ => LanguageExpression::Literal(Literal::Null),
            },
            ExpressionKind::FunctionCall { name, arguments, .. } => LanguageExpression::call(
                name.name.clone(),
                arguments.iter().map(|a| self.expression(a)).collect(),
            ),
            ExpressionKind::PropertyAccess { base, property } => {
                let resource = match (&base.kind, self.model.binding(base.id)) {
                    (ExpressionKind::Reference(_), Some(Symbol::Resource(resource))) => Some(resource),
                    _ => None,
                };
                match resource {
                    Some(resource) => match property.name.as_str() {
                        "id" => self.resource_id(resource.declaration),
                        "name" => self.resource_name(resource.declaration),
                        "type" => LanguageExpression::string(resource.full_type().unwrap_or_default()),
                        "apiVersion" => {
                            LanguageExpression::string(resource.api_version().unwrap_or_default())
                        }
                        other => self.resource_reference(resource.declaration).property(other),
                    },
                    None => self.expression(base).property(property.name.clone()),
                }
            }
            ExpressionKind::ArrayAccess { base, index } => {
                self.expression(base).index(self.expression(index))
            }
            ExpressionKind::Object(properties) => LanguageExpression::call(
                "createObject",
                properties
                    .iter()
                    .flat_map(|p| [LanguageExpression::string(&p.key), self.expression(&p.value)])
                    .collect(),
            ),
            ExpressionKind::Array(items) => LanguageExpression::call(
                "createArray",
                items.iter().map(|item| self.expression(item)).collect(),
            ),
            ExpressionKind::Interpolated(segments) => {
                let mut format = String::new();
                let mut arguments = vec![];
                for segment in segments {
                    match segment {
                        StringSegment::Text(text) => {
                            format.push_str(&text.replace('{', "{{").replace('}', "}}"));
                        }
                        StringSegment::Expression(inner) => {
                            format.push_str(&format!("{{{}}}", arguments.len()));
                            arguments.push(self.expression(inner));
                        }
                    }
                }
                arguments.insert(0, LanguageExpression::string(format));
                LanguageExpression::call("format", arguments)
            }
            ExpressionKind::Skipped => LanguageExpression::Literal(Literal::Null),
        }
    }

    /// `resourceId('<type>', <name segments>...)`. A literal name containing
    /// `/` is passed as one argument per segment.
    pub(super) fn resource_id(&self, declaration: usize) -> LanguageExpression {
        let full_type = match self.model.declaration_symbol(declaration) {
            Some(Symbol::Resource(resource)) => resource.full_type().unwrap_or_default(),
            _ => "",
        };
        let mut arguments = vec![LanguageExpression::string(full_type)];
        match self.resource_name(declaration) {
            LanguageExpression::Literal(Literal::String(name)) if name.contains('/') => {
                arguments.extend(name.split('/').map(LanguageExpression::string));
            }
            name => arguments.push(name),
        }
        LanguageExpression::call("resourceId", arguments)
    }

    fn resource_name(&self, declaration: usize) -> LanguageExpression {
        match self.model.program().declarations.get(declaration) {
            Some(Declaration::Resource(resource)) => resource
                .body
                .property("name")
                .map_or_else(|| LanguageExpression::string(""), |p| self.expression(&p.value)),
            _ => LanguageExpression::string(""),
        }
    }

    /// `reference(resourceId(...), '<apiVersion>', 'full')`
    fn resource_reference(&self, declaration: usize) -> LanguageExpression {
        let api_version = match self.model.declaration_symbol(declaration) {
            Some(Symbol::Resource(resource)) => resource.api_version().unwrap_or_default(),
            _ => "",
        };
        LanguageExpression::call(
            "reference",
            vec![
                self.resource_id(declaration),
                LanguageExpression::string(api_version),
                LanguageExpression::string("full"),
            ],
        )
    }
}

/// A literal string starting with `[` is escaped as `[[` so it is not read
/// back as an expression.
fn escape_literal(text: &str) -> String {
    if text.starts_with('[') {
        format!("[{text}")
    } else {
        text.to_string()
    }
}

/// Renders `[expr]`, enforcing the expression length limit.
pub(super) fn template_string(expression: &LanguageExpression, path: &str) -> Result<String, EmitError> {
    let text = expression.to_template_string();
    check_limit(&text).map_err(|_| EmitError::LimitExceeded {
        path: path.to_string(),
        length: text.chars().count(),
        limit: infra_forge_core::expression::EXPRESSION_LIMIT,
    })?;
    Ok(text)
}
