//! Syntax tree produced by the parser and consumed by the binder and printer.
//!
//! Every node carries the byte span it was parsed from. Expression nodes also
//! carry a [`NodeId`], unique within one [`Program`], that the binder uses to
//! attach resolved symbols without mutating the tree.

use infra_forge_core::expression::Literal;
use infra_forge_core::{Diagnostic, LineIndex, Span};

/// Identity of an expression node within its program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

/// Hands out fresh node ids.
#[derive(Debug, Default)]
pub struct NodeIds {
    next: u32,
}

impl NodeIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    /// Builds an expression with a fresh id.
    pub fn expression(&mut self, kind: ExpressionKind, span: Span) -> Expression {
        Expression {
            id: self.next_id(),
            kind,
            span,
        }
    }
}

/// A parsed file: its declarations in source order plus parse diagnostics.
#[derive(Debug, Clone)]
pub struct Program {
    pub declarations: Vec<Declaration>,
    pub diagnostics: Vec<Diagnostic>,
    pub line_index: LineIndex,
}

impl Program {
    /// Iterates over real declarations, skipping recovery placeholders.
    pub fn named_declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.declarations
            .iter()
            .filter(|d| !matches!(d, Declaration::Skipped(_)))
    }

    pub fn has_errors(&self) -> bool {
        infra_forge_core::has_errors(&self.diagnostics)
    }
}

/// A name together with where it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

impl Identifier {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// A type name as written, e.g. `string`. Resolved by the binder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeAnnotation {
    pub name: String,
    pub span: Span,
}

/// A top-level declaration.
#[derive(Debug, Clone)]
pub enum Declaration {
    Parameter(ParameterDeclaration),
    Variable(VariableDeclaration),
    Resource(ResourceDeclaration),
    Output(OutputDeclaration),
    /// Placeholder for a region skipped during error recovery.
    Skipped(Span),
}

impl Declaration {
    pub fn name(&self) -> Option<&Identifier> {
        match self {
            Self::Parameter(d) => Some(&d.name),
            Self::Variable(d) => Some(&d.name),
            Self::Resource(d) => Some(&d.name),
            Self::Output(d) => Some(&d.name),
            Self::Skipped(_) => None,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Self::Parameter(d) => d.span,
            Self::Variable(d) => d.span,
            Self::Resource(d) => d.span,
            Self::Output(d) => d.span,
            Self::Skipped(span) => *span,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Parameter(_) => "parameter",
            Self::Variable(_) => "variable",
            Self::Resource(_) => "resource",
            Self::Output(_) => "output",
            Self::Skipped(_) => "<skipped>",
        }
    }

    /// The declaration's body expression, if it has one.
    pub fn body(&self) -> Option<&Expression> {
        match self {
            Self::Parameter(d) => d.default_value.as_ref(),
            Self::Variable(d) => Some(&d.value),
            Self::Resource(d) => Some(&d.body),
            Self::Output(d) => Some(&d.value),
            Self::Skipped(_) => None,
        }
    }
}

/// `parameter name: type (= default)?`
#[derive(Debug, Clone)]
pub struct ParameterDeclaration {
    pub name: Identifier,
    pub type_annotation: TypeAnnotation,
    pub default_value: Option<Expression>,
    pub span: Span,
}

/// `variable name = value`
#[derive(Debug, Clone)]
pub struct VariableDeclaration {
    pub name: Identifier,
    pub value: Expression,
    pub span: Span,
}

/// `resource name: 'provider/type@apiVersion' = { ... }`
#[derive(Debug, Clone)]
pub struct ResourceDeclaration {
    pub name: Identifier,
    pub resource_type: ResourceTypeReference,
    pub body: Expression,
    pub span: Span,
}

/// The quoted type header of a resource, unvalidated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTypeReference {
    pub text: String,
    pub span: Span,
}

impl ResourceTypeReference {
    /// Splits `provider/type@version` into the full type and the API version.
    ///
    /// Returns `None` unless there is exactly one `@` and the type part
    /// contains a `/` with text on both sides.
    pub fn split(&self) -> Option<(&str, &str)> {
        let (full_type, api_version) = self.text.split_once('@')?;
        if api_version.is_empty() || api_version.contains('@') {
            return None;
        }
        let (provider, kind) = full_type.split_once('/')?;
        if provider.is_empty() || kind.is_empty() {
            return None;
        }
        Some((full_type, api_version))
    }
}

/// `output name(: type)? = value`
#[derive(Debug, Clone)]
pub struct OutputDeclaration {
    pub name: Identifier,
    pub type_annotation: Option<TypeAnnotation>,
    pub value: Expression,
    pub span: Span,
}

/// An expression node.
#[derive(Debug, Clone)]
pub struct Expression {
    pub id: NodeId,
    pub kind: ExpressionKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExpressionKind {
    Literal(Literal),
    /// A bare identifier referring to a declaration.
    Reference(Identifier),
    FunctionCall {
        namespace: Option<Identifier>,
        name: Identifier,
        arguments: Vec<Expression>,
    },
    PropertyAccess {
        base: Box<Expression>,
        property: Identifier,
    },
    ArrayAccess {
        base: Box<Expression>,
        index: Box<Expression>,
    },
    Object(Vec<ObjectProperty>),
    Array(Vec<Expression>),
    /// A string with at least one `${...}` hole.
    Interpolated(Vec<StringSegment>),
    /// Placeholder for an expression that failed to parse.
    Skipped,
}

/// `key: value` inside an object literal. Keys are unique within one literal.
#[derive(Debug, Clone)]
pub struct ObjectProperty {
    pub key: String,
    pub key_span: Span,
    pub value: Expression,
}

#[derive(Debug, Clone)]
pub enum StringSegment {
    Text(String),
    Expression(Expression),
}

impl Expression {
    pub fn as_object(&self) -> Option<&[ObjectProperty]> {
        match &self.kind {
            ExpressionKind::Object(properties) => Some(properties),
            _ => None,
        }
    }

    pub fn as_string_literal(&self) -> Option<&str> {
        match &self.kind {
            ExpressionKind::Literal(Literal::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Looks up a property of an object literal by key.
    pub fn property(&self, key: &str) -> Option<&ObjectProperty> {
        self.as_object()?.iter().find(|p| p.key == key)
    }

    /// Calls `visit` on this expression and every expression nested in it, parents first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expression)) {
        visit(self);
        match &self.kind {
            ExpressionKind::FunctionCall { arguments, .. } => {
                for argument in arguments {
                    argument.walk(visit);
                }
            }
            ExpressionKind::PropertyAccess { base, .. } => base.walk(visit),
            ExpressionKind::ArrayAccess { base, index } => {
                base.walk(visit);
                index.walk(visit);
            }
            ExpressionKind::Object(properties) => {
                for property in properties {
                    property.value.walk(visit);
                }
            }
            ExpressionKind::Array(items) => {
                for item in items {
                    item.walk(visit);
                }
            }
            ExpressionKind::Interpolated(segments) => {
                for segment in segments {
                    if let StringSegment::Expression(expr) = segment {
                        expr.walk(visit);
                    }
                }
            }
            ExpressionKind::Literal(_) | ExpressionKind::Reference(_) | ExpressionKind::Skipped => {}
        }
    }
}
