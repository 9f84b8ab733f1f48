//! Forward compilation: a bound [`SemanticModel`] to a target-format document.

mod lower;
mod order;

use infra_forge_core::Diagnostic;
use infra_forge_dsl::Declaration;
use serde_json::{json, Map, Value};

use crate::semantic::{DeclaredType, SemanticModel, Symbol};
use lower::{template_string, Lowering};

pub const SCHEMA: &str =
    "https://schema.management.azure.com/schemas/2019-04-01/deploymentTemplate.json#";
pub const CONTENT_VERSION: &str = "1.0.0.0";

/// The emitted document plus every diagnostic of the model it came from.
#[derive(Debug, Clone)]
pub struct Emission {
    pub document: Value,
    pub diagnostics: Vec<Diagnostic>,
}

impl Emission {
    pub fn has_errors(&self) -> bool {
        infra_forge_core::has_errors(&self.diagnostics)
    }

    /// Pretty-printed JSON with a trailing newline.
    pub fn to_json_string(&self) -> Result<String, EmitError> {
        let mut text = serde_json::to_string_pretty(&self.document)?;
        text.push('\n');
        Ok(text)
    }
}

/// Conditions that stop emission of a document.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum EmitError {
    /// Resources whose references form a cycle cannot be ordered.
    #[error("cannot order declarations: dependency cycle among {}", quoted(.names))]
    DependencyCycle { names: Vec<String> },

    /// An emitted expression string is over the length ceiling.
    #[error("expression at '{path}' is {length} characters long; the limit is {limit}")]
    LimitExceeded {
        path: String,
        length: usize,
        limit: usize,
    },

    /// The strict entry point refuses models with error diagnostics.
    #[error("the model has {} error(s) and cannot be emitted for deployment", .diagnostics.iter().filter(|d| d.is_error()).count())]
    ModelHasErrors { diagnostics: Vec<Diagnostic> },

    #[error("failed to serialize the document: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn quoted(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("'{n}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Emits a document for `model`.
///
/// Runs even when the model has error diagnostics, producing a best-effort
/// document; those diagnostics are passed through and the result should not
/// be deployed. Use [`emit_for_deployment`] to refuse such models.
///
/// # Errors
///
/// `DependencyCycle` when the model has reference cycles, `LimitExceeded`
/// when an emitted expression is too long.
pub fn emit(model: &SemanticModel) -> Result<Emission, EmitError> {
    if let Some(cycle) = model.cycles().first() {
        let names = cycle
            .iter()
            .filter_map(|i| model.program().declarations[*i].name())
            .map(|id| id.name.clone())
            .collect();
        return Err(EmitError::DependencyCycle { names });
    }

    let dependencies = order::resource_dependencies(model);
    let resource_order = order::order_resources(model, &dependencies)?;
    let lowering = Lowering::new(model);
    let declarations = &model.program().declarations;

    let mut parameters = Map::new();
    let mut variables = Map::new();
    let mut outputs = Map::new();
    for (index, declaration) in declarations.iter().enumerate() {
        match declaration {
            Declaration::Parameter(d) if !parameters.contains_key(&d.name.name) => {
                let declared = match model.declaration_symbol(index) {
                    Some(Symbol::Parameter(s)) => s.declared_type,
                    _ => None,
                };
                let mut entry = Map::new();
                entry.insert("type".into(), type_name(declared).into());
                if let Some(default) = &d.default_value {
                    let path = format!("parameters.{}.defaultValue", d.name.name);
                    entry.insert("defaultValue".into(), lowering.value(default, &path)?);
                }
                parameters.insert(d.name.name.clone(), Value::Object(entry));
            }
            Declaration::Variable(d) if !variables.contains_key(&d.name.name) => {
                let path = format!("variables.{}", d.name.name);
                variables.insert(d.name.name.clone(), lowering.value(&d.value, &path)?);
            }
            Declaration::Output(d) if !outputs.contains_key(&d.name.name) => {
                let declared = match model.declaration_symbol(index) {
                    Some(Symbol::Output(s)) => s.declared_type,
                    _ => None,
                }
                .or_else(|| DeclaredType::from_kind(model.declaration_type(index)));
                let path = format!("outputs.{}.value", d.name.name);
                outputs.insert(
                    d.name.name.clone(),
                    json!({
                        "type": type_name(declared),
                        "value": lowering.value(&d.value, &path)?,
                    }),
                );
            }
            _ => {}
        }
    }

    let mut resources = Vec::with_capacity(resource_order.len());
    for (position, index) in resource_order.iter().copied().enumerate() {
        let Declaration::Resource(d) = &declarations[index] else {
            continue;
        };
        let path = format!("resources[{position}]");
        let (full_type, api_version) = d
            .resource_type
            .split()
            .unwrap_or((d.resource_type.text.as_str(), ""));

        let mut entry = Map::new();
        entry.insert("type".into(), full_type.into());
        entry.insert("apiVersion".into(), api_version.into());
        let name = match d.body.property("name") {
            Some(property) => lowering.value(&property.value, &format!("{path}.name"))?,
            None => Value::String(String::new()),
        };
        entry.insert("name".into(), name);
        for property in d.body.as_object().unwrap_or_default() {
            if matches!(property.key.as_str(), "name" | "dependsOn" | "type" | "apiVersion") {
                continue;
            }
            let value = lowering.value(&property.value, &format!("{path}.{}", property.key))?;
            entry.insert(property.key.clone(), value);
        }

        let depends_on = dependencies[index]
            .iter()
            .map(|target| {
                template_string(&lowering.resource_id(*target), &format!("{path}.dependsOn"))
                    .map(Value::String)
            })
            .collect::<Result<Vec<_>, _>>()?;
        if !depends_on.is_empty() {
            entry.insert("dependsOn".into(), Value::Array(depends_on));
        }
        resources.push(Value::Object(entry));
    }

    let mut document = Map::new();
    document.insert("$schema".into(), SCHEMA.into());
    document.insert("contentVersion".into(), CONTENT_VERSION.into());
    document.insert("parameters".into(), Value::Object(parameters));
    document.insert("functions".into(), Value::Array(vec![]));
    document.insert("variables".into(), Value::Object(variables));
    document.insert("resources".into(), Value::Array(resources));
    document.insert("outputs".into(), Value::Object(outputs));

    tracing::debug!(
        resources = resource_order.len(),
        diagnostics = model.diagnostics().len(),
        "emission complete"
    );
    Ok(Emission {
        document: Value::Object(document),
        diagnostics: model.diagnostics().to_vec(),
    })
}

/// Emits only clean models.
///
/// # Errors
///
/// `ModelHasErrors` carrying the model's diagnostics when any has error
/// severity, otherwise as [`emit`].
pub fn emit_for_deployment(model: &SemanticModel) -> Result<Emission, EmitError> {
    if model.has_errors() {
        return Err(EmitError::ModelHasErrors {
            diagnostics: model.diagnostics().to_vec(),
        });
    }
    emit(model)
}

fn type_name(declared: Option<DeclaredType>) -> &'static str {
    declared.map_or("object", DeclaredType::template_name)
}
