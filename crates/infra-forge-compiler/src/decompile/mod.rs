//! Reverse compilation: a target-format document back to a DSL syntax tree.
//!
//! Decompilation is total over well-shaped documents. An embedded
//! expression that cannot be parsed, or that has no DSL equivalent, is kept
//! as a literal string and a warning carrying its JSON path is recorded.
//! Only malformed JSON, a malformed document shape, or an expression over
//! the length limit fail the document.

mod expression;
pub mod naming;

use infra_forge_core::error::ErrorInfo;
use infra_forge_core::expression::{is_language_expression, parse_language_expression, Literal};
use infra_forge_core::{Diagnostic, DiagnosticKind, ExpressionError, LineIndex, Severity, Span};
use infra_forge_dsl::{
    parse, print, Declaration, Expression, ExpressionKind, Identifier, NodeIds, ObjectProperty,
    OutputDeclaration, ParameterDeclaration, Program, ResourceDeclaration, ResourceTypeReference,
    TypeAnnotation, VariableDeclaration,
};
use serde_json::{Map, Value};

use crate::semantic::{bind, DeclaredType, SemanticModel};
use expression::{name_key, Converter, Names, ResourceEntry};
use naming::NameTable;

/// A decompiled syntax tree plus the warnings produced while building it.
#[derive(Debug, Clone)]
pub struct Decompilation {
    pub program: Program,
    pub diagnostics: Vec<Diagnostic>,
}

/// Printed DSL text for a document, re-parsed and re-bound.
#[derive(Debug, Clone)]
pub struct DecompiledSource {
    pub text: String,
    pub model: SemanticModel,
    /// Decompilation warnings followed by the diagnostics of binding `text`.
    pub diagnostics: Vec<Diagnostic>,
}

impl DecompiledSource {
    pub fn has_errors(&self) -> bool {
        infra_forge_core::has_errors(&self.diagnostics)
    }
}

/// Conditions that fail a whole document.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DecompileError {
    #[error("invalid JSON at line {line}, column {column}: {message}")]
    InvalidJson {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("unexpected document shape at '{path}': {message}")]
    InvalidShape { path: String, message: String },

    #[error("expression at '{path}' is {length} characters long; the limit is {limit}")]
    LimitExceeded {
        path: String,
        length: usize,
        limit: usize,
    },
}

impl From<serde_json::Error> for DecompileError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidJson {
            message: err.to_string(),
            line: err.line(),
            column: err.column(),
        }
    }
}

fn invalid_shape(path: impl Into<String>, message: impl Into<String>) -> DecompileError {
    DecompileError::InvalidShape {
        path: path.into(),
        message: message.into(),
    }
}

/// Decompiles target-format JSON text.
///
/// # Errors
///
/// See [`DecompileError`].
pub fn decompile(json: &str) -> Result<Decompilation, DecompileError> {
    let document: Value = serde_json::from_str(json)?;
    decompile_value(&document)
}

/// Decompiles an already parsed document.
///
/// # Errors
///
/// See [`DecompileError`].
pub fn decompile_value(document: &Value) -> Result<Decompilation, DecompileError> {
    let root = document
        .as_object()
        .ok_or_else(|| invalid_shape("$", "expected a JSON object"))?;
    let mut decompiler = Decompiler::default();
    let declarations = decompiler.run(root)?;
    tracing::debug!(
        declarations = declarations.len(),
        warnings = decompiler.diagnostics.len(),
        "decompilation complete"
    );
    Ok(Decompilation {
        program: Program {
            declarations,
            diagnostics: Vec::new(),
            line_index: LineIndex::new(""),
        },
        diagnostics: decompiler.diagnostics,
    })
}

/// Decompiles, prints, then parses and binds the printed text again.
///
/// # Errors
///
/// See [`DecompileError`].
pub fn decompile_to_source(json: &str) -> Result<DecompiledSource, DecompileError> {
    let decompilation = decompile(json)?;
    let text = print(&decompilation.program);
    let model = bind(parse(&text));
    let mut diagnostics = decompilation.diagnostics;
    diagnostics.extend(model.diagnostics().iter().cloned());
    Ok(DecompiledSource {
        text,
        model,
        diagnostics,
    })
}

fn section<'v>(
    root: &'v Map<String, Value>,
    key: &str,
) -> Result<Option<&'v Map<String, Value>>, DecompileError> {
    match root.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(invalid_shape(key, "expected an object")),
    }
}

#[derive(Default)]
struct Decompiler {
    names: Names,
    ids: NodeIds,
    diagnostics: Vec<Diagnostic>,
}

impl Decompiler {
    fn warn(&mut self, message: impl Into<String>, path: impl Into<String>) {
        self.diagnostics.push(Diagnostic::at_path(
            Severity::Warning,
            DiagnosticKind::Decompilation,
            message,
            path,
        ));
    }

    fn run(&mut self, root: &Map<String, Value>) -> Result<Vec<Declaration>, DecompileError> {
        let parameters = section(root, "parameters")?;
        let variables = section(root, "variables")?;
        let outputs = section(root, "outputs")?;
        let resources = match root.get("resources") {
            None | Some(Value::Null) => &[][..],
            Some(Value::Array(items)) => items.as_slice(),
            Some(_) => return Err(invalid_shape("resources", "expected an array")),
        };
        if let Some(Value::Array(functions)) = root.get("functions") {
            if !functions.is_empty() {
                self.warn("user-defined functions are not supported and were dropped", "functions");
            }
        }

        // Names first: any value may reference any declaration.
        let mut table = NameTable::new();
        let parameter_names = self.claim(&mut table, parameters, true);
        let variable_names = self.claim(&mut table, variables, false);
        let mut resource_shapes = Vec::with_capacity(resources.len());
        for (i, resource) in resources.iter().enumerate() {
            let shape = ResourceShape::read(resource, &format!("resources[{i}]"))?;
            let symbol = match &shape.name {
                Value::String(name) if !is_language_expression(name) => table.claim(name),
                _ => table.claim(shape.full_type.rsplit('/').next().unwrap_or(shape.full_type)),
            };
            let key = match &shape.name {
                Value::String(name) => name_key(name),
                other => other.to_string(),
            };
            self.names.resources.push(ResourceEntry {
                symbol,
                full_type: shape.full_type.to_string(),
                name_key: key,
            });
            resource_shapes.push(shape);
        }
        let output_names: Vec<String> = outputs
            .into_iter()
            .flat_map(|map| map.keys())
            .map(|name| table.claim(name))
            .collect();

        let mut declarations = Vec::new();
        for ((name, definition), identifier) in parameters.into_iter().flatten().zip(parameter_names) {
            declarations.push(self.parameter(name, definition, identifier)?);
        }
        for ((name, value), identifier) in variables.into_iter().flatten().zip(variable_names) {
            let value = self.value(value, &format!("variables.{name}"))?;
            declarations.push(Declaration::Variable(VariableDeclaration {
                name: Identifier::new(identifier, Span::default()),
                value,
                span: Span::default(),
            }));
        }
        for (i, shape) in resource_shapes.iter().enumerate() {
            declarations.push(self.resource(i, shape)?);
        }
        for ((name, definition), identifier) in outputs.into_iter().flatten().zip(output_names) {
            declarations.push(self.output(name, definition, identifier)?);
        }
        Ok(declarations)
    }

    fn claim(
        &mut self,
        table: &mut NameTable,
        section: Option<&Map<String, Value>>,
        parameters: bool,
    ) -> Vec<String> {
        let mut claimed = Vec::new();
        for name in section.into_iter().flat_map(|map| map.keys()) {
            let identifier = table.claim(name);
            let names = if parameters {
                &mut self.names.parameters
            } else {
                &mut self.names.variables
            };
            names.insert(name.to_ascii_lowercase(), identifier.clone());
            claimed.push(identifier);
        }
        claimed
    }

    fn parameter(
        &mut self,
        name: &str,
        definition: &Value,
        identifier: String,
    ) -> Result<Declaration, DecompileError> {
        let path = format!("parameters.{name}");
        let definition = definition
            .as_object()
            .ok_or_else(|| invalid_shape(&path, "expected an object"))?;
        let declared = self.declared_type(definition, &path).unwrap_or(DeclaredType::Object);
        let default_value = match definition.get("defaultValue") {
            Some(value) => Some(self.value(value, &format!("{path}.defaultValue"))?),
            None => None,
        };
        for key in definition.keys() {
            if key != "type" && key != "defaultValue" {
                self.warn(format!("'{key}' is not supported and was dropped"), format!("{path}.{key}"));
            }
        }
        Ok(Declaration::Parameter(ParameterDeclaration {
            name: Identifier::new(identifier, Span::default()),
            type_annotation: annotation(declared),
            default_value,
            span: Span::default(),
        }))
    }

    fn output(
        &mut self,
        name: &str,
        definition: &Value,
        identifier: String,
    ) -> Result<Declaration, DecompileError> {
        let path = format!("outputs.{name}");
        let definition = definition
            .as_object()
            .ok_or_else(|| invalid_shape(&path, "expected an object"))?;
        let declared = self.declared_type(definition, &path);
        let value = match definition.get("value") {
            Some(value) => self.value(value, &format!("{path}.value"))?,
            None => {
                self.warn("output has no 'value'; it was replaced with null", &path);
                self.ids
                    .expression(ExpressionKind::Literal(Literal::Null), Span::default())
            }
        };
        Ok(Declaration::Output(OutputDeclaration {
            name: Identifier::new(identifier, Span::default()),
            type_annotation: declared.map(annotation),
            value,
            span: Span::default(),
        }))
    }

    fn declared_type(&mut self, definition: &Map<String, Value>, path: &str) -> Option<DeclaredType> {
        let raw = definition.get("type").and_then(Value::as_str);
        let declared = raw.and_then(DeclaredType::from_template_name);
        if declared.is_none() {
            let shown = raw.map_or_else(|| "missing".to_string(), |t| format!("'{t}'"));
            self.warn(format!("type {shown} is not supported; using 'object'"), format!("{path}.type"));
        }
        declared
    }

    fn resource(&mut self, index: usize, shape: &ResourceShape<'_>) -> Result<Declaration, DecompileError> {
        let path = format!("resources[{index}]");
        let symbol = self.names.resources[index].symbol.clone();

        let mut properties = vec![ObjectProperty {
            key: "name".to_string(),
            key_span: Span::default(),
            value: self.value(shape.name, &format!("{path}.name"))?,
        }];
        for (key, value) in shape.body {
            if matches!(key.as_str(), "type" | "apiVersion" | "name" | "dependsOn") {
                continue;
            }
            properties.push(ObjectProperty {
                key: key.clone(),
                key_span: Span::default(),
                value: self.value(value, &format!("{path}.{key}"))?,
            });
        }

        let mut dependencies: Vec<String> = Vec::new();
        match shape.body.get("dependsOn") {
            None => {}
            Some(Value::Array(entries)) => {
                for (i, entry) in entries.iter().enumerate() {
                    let entry_path = format!("{path}.dependsOn[{i}]");
                    let resolved = entry
                        .as_str()
                        .and_then(|text| self.names.resolve_dependency(text))
                        .map(|r| r.symbol.clone())
                        .filter(|target| *target != symbol);
                    match resolved {
                        Some(target) if !dependencies.contains(&target) => dependencies.push(target),
                        Some(_) => {}
                        None => self.warn(
                            format!("dependency {entry} does not match a resource in this document and was dropped"),
                            entry_path,
                        ),
                    }
                }
            }
            Some(_) => return Err(invalid_shape(format!("{path}.dependsOn"), "expected an array")),
        }
        if !dependencies.is_empty() {
            let items = dependencies
                .iter()
                .map(|target| {
                    self.ids.expression(
                        ExpressionKind::Reference(Identifier::new(target.as_str(), Span::default())),
                        Span::default(),
                    )
                })
                .collect();
            properties.push(ObjectProperty {
                key: "dependsOn".to_string(),
                key_span: Span::default(),
                value: self.ids.expression(ExpressionKind::Array(items), Span::default()),
            });
        }

        let body = self.ids.expression(ExpressionKind::Object(properties), Span::default());
        Ok(Declaration::Resource(ResourceDeclaration {
            name: Identifier::new(symbol, Span::default()),
            resource_type: ResourceTypeReference {
                text: format!("{}@{}", shape.full_type, shape.api_version),
                span: Span::default(),
            },
            body,
            span: Span::default(),
        }))
    }

    /// Converts a JSON value, parsing embedded expressions.
    fn value(&mut self, value: &Value, path: &str) -> Result<Expression, DecompileError> {
        let kind = match value {
            Value::Null => ExpressionKind::Literal(Literal::Null),
            Value::Bool(b) => ExpressionKind::Literal(Literal::Boolean(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(n) => ExpressionKind::Literal(Literal::Integer(n)),
                None => {
                    self.warn(format!("number {n} is not a 64-bit integer; kept as a string"), path);
                    ExpressionKind::Literal(Literal::String(n.to_string()))
                }
            },
            Value::String(text) => return self.string(text, path),
            Value::Array(items) => {
                let items = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.value(item, &format!("{path}[{i}]")))
                    .collect::<Result<Vec<_>, _>>()?;
                ExpressionKind::Array(items)
            }
            Value::Object(map) => {
                let mut properties = Vec::with_capacity(map.len());
                for (key, item) in map {
                    properties.push(ObjectProperty {
                        key: key.clone(),
                        key_span: Span::default(),
                        value: self.value(item, &format!("{path}.{key}"))?,
                    });
                }
                ExpressionKind::Object(properties)
            }
        };
        Ok(self.ids.expression(kind, Span::default()))
    }

    fn string(&mut self, text: &str, path: &str) -> Result<Expression, DecompileError> {
        let literal = |ids: &mut NodeIds, text: &str| {
            ids.expression(ExpressionKind::Literal(Literal::String(text.to_string())), Span::default())
        };
        if !is_language_expression(text) {
            let unescaped = text.strip_prefix('[').filter(|rest| rest.starts_with('[')).unwrap_or(text);
            return Ok(literal(&mut self.ids, unescaped));
        }

        let context = ErrorInfo::new(1, 1).with_path(path);
        match parse_language_expression(text, Some(&context)) {
            Ok(parsed) => {
                let converted = Converter::new(&self.names, &mut self.ids).convert(&parsed);
                match converted {
                    Ok(expression) => Ok(expression),
                    Err(reason) => {
                        self.warn(format!("{reason}; the expression was kept as a string"), path);
                        Ok(literal(&mut self.ids, text))
                    }
                }
            }
            Err(ExpressionError::LimitExceeded { length, limit }) => Err(DecompileError::LimitExceeded {
                path: path.to_string(),
                length,
                limit,
            }),
            Err(err) => {
                self.warn(format!("{err}; the expression was kept as a string"), path);
                Ok(literal(&mut self.ids, text))
            }
        }
    }
}

/// The required fields of one resource entry.
struct ResourceShape<'v> {
    full_type: &'v str,
    api_version: &'v str,
    name: &'v Value,
    body: &'v Map<String, Value>,
}

impl<'v> ResourceShape<'v> {
    fn read(value: &'v Value, path: &str) -> Result<Self, DecompileError> {
        let body = value
            .as_object()
            .ok_or_else(|| invalid_shape(path, "expected an object"))?;
        let text = |key: &str| {
            body.get(key)
                .and_then(Value::as_str)
                .ok_or_else(|| invalid_shape(format!("{path}.{key}"), "expected a string"))
        };
        Ok(Self {
            full_type: text("type")?,
            api_version: text("apiVersion")?,
            name: body
                .get("name")
                .ok_or_else(|| invalid_shape(format!("{path}.name"), "missing"))?,
            body,
        })
    }
}

fn annotation(declared: DeclaredType) -> TypeAnnotation {
    TypeAnnotation {
        name: declared.dsl_name().to_string(),
        span: Span::default(),
    }
}
