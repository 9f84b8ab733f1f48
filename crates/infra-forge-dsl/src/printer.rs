use infra_forge_core::expression::Literal;

use crate::syntax::{
    Declaration, Expression, ExpressionKind, ObjectProperty, OutputDeclaration,
    ParameterDeclaration, Program, ResourceDeclaration, StringSegment, VariableDeclaration,
};
use crate::token::is_keyword;

const INDENT: &str = "  ";

/// Print a program to DSL text.
///
/// Declarations are grouped as parameters, variables, resources, then
/// outputs, keeping their relative order within each group, with a blank
/// line between groups. Objects and arrays are printed one entry per line
/// with 2-space indentation. Skip nodes from error recovery are dropped.
pub fn print(program: &Program) -> String {
    print_declarations(&program.declarations)
}

/// Print a list of declarations in the same layout as [`print`].
pub fn print_declarations(declarations: &[Declaration]) -> String {
    let groups: [Vec<&Declaration>; 4] = [
        declarations
            .iter()
            .filter(|d| matches!(d, Declaration::Parameter(_)))
            .collect(),
        declarations
            .iter()
            .filter(|d| matches!(d, Declaration::Variable(_)))
            .collect(),
        declarations
            .iter()
            .filter(|d| matches!(d, Declaration::Resource(_)))
            .collect(),
        declarations
            .iter()
            .filter(|d| matches!(d, Declaration::Output(_)))
            .collect(),
    ];

    let mut output = String::new();
    for group in groups.iter().filter(|g| !g.is_empty()) {
        if !output.is_empty() {
            output.push('\n');
        }
        for declaration in group {
            print_declaration(declaration, &mut output);
            output.push('\n');
        }
    }
    output
}

/// Print a single expression as it would appear in a declaration body.
pub fn print_expression(expression: &Expression) -> String {
    let mut output = String::new();
    print_expr(expression, &mut output, Layout::Block(0));
    output
}

/// How nested objects and arrays are laid out.
#[derive(Clone, Copy)]
enum Layout {
    /// One entry per line at the given depth.
    Block(usize),
    /// Everything on one line, as required inside `${...}`.
    Inline,
}

impl Layout {
    fn nested(self) -> Self {
        match self {
            Self::Block(depth) => Self::Block(depth + 1),
            Self::Inline => Self::Inline,
        }
    }
}

fn print_declaration(declaration: &Declaration, output: &mut String) {
    match declaration {
        Declaration::Parameter(d) => print_parameter(d, output),
        Declaration::Variable(d) => print_variable(d, output),
        Declaration::Resource(d) => print_resource(d, output),
        Declaration::Output(d) => print_output(d, output),
        Declaration::Skipped(_) => {}
    }
}

fn print_parameter(declaration: &ParameterDeclaration, output: &mut String) {
    output.push_str("parameter ");
    output.push_str(&declaration.name.name);
    output.push_str(": ");
    output.push_str(&declaration.type_annotation.name);
    if let Some(default_value) = &declaration.default_value {
        output.push_str(" = ");
        print_expr(default_value, output, Layout::Block(0));
    }
}

fn print_variable(declaration: &VariableDeclaration, output: &mut String) {
    output.push_str("variable ");
    output.push_str(&declaration.name.name);
    output.push_str(" = ");
    print_expr(&declaration.value, output, Layout::Block(0));
}

fn print_resource(declaration: &ResourceDeclaration, output: &mut String) {
    output.push_str("resource ");
    output.push_str(&declaration.name.name);
    output.push_str(": ");
    print_string(&declaration.resource_type.text, output);
    output.push_str(" = ");
    print_expr(&declaration.body, output, Layout::Block(0));
}

fn print_output(declaration: &OutputDeclaration, output: &mut String) {
    output.push_str("output ");
    output.push_str(&declaration.name.name);
    if let Some(type_annotation) = &declaration.type_annotation {
        output.push_str(": ");
        output.push_str(&type_annotation.name);
    }
    output.push_str(" = ");
    print_expr(&declaration.value, output, Layout::Block(0));
}

fn print_expr(expression: &Expression, output: &mut String, layout: Layout) {
    match &expression.kind {
        ExpressionKind::Literal(literal) => print_literal(literal, output),
        ExpressionKind::Reference(identifier) => output.push_str(&identifier.name),
        ExpressionKind::FunctionCall {
            namespace,
            name,
            arguments,
        } => {
            if let Some(namespace) = namespace {
                output.push_str(&namespace.name);
                output.push('.');
            }
            output.push_str(&name.name);
            output.push('(');
            for (i, argument) in arguments.iter().enumerate() {
                if i > 0 {
                    output.push_str(", ");
                }
                print_expr(argument, output, layout);
            }
            output.push(')');
        }
        ExpressionKind::PropertyAccess { base, property } => {
            print_expr(base, output, layout);
            output.push('.');
            output.push_str(&property.name);
        }
        ExpressionKind::ArrayAccess { base, index } => {
            print_expr(base, output, layout);
            output.push('[');
            print_expr(index, output, layout);
            output.push(']');
        }
        ExpressionKind::Object(properties) => print_object(properties, output, layout),
        ExpressionKind::Array(items) => print_array(items, output, layout),
        ExpressionKind::Interpolated(segments) => {
            output.push('\'');
            for segment in segments {
                match segment {
                    StringSegment::Text(text) => push_escaped(text, output),
                    StringSegment::Expression(expr) => {
                        output.push_str("${");
                        print_expr(expr, output, Layout::Inline);
                        output.push('}');
                    }
                }
            }
            output.push('\'');
        }
        ExpressionKind::Skipped => output.push_str("null"),
    }
}

fn print_object(properties: &[ObjectProperty], output: &mut String, layout: Layout) {
    if properties.is_empty() {
        output.push_str("{}");
        return;
    }
    match layout {
        Layout::Inline => {
            output.push_str("{ ");
            for (i, property) in properties.iter().enumerate() {
                if i > 0 {
                    output.push_str(", ");
                }
                print_property(property, output, layout);
            }
            output.push_str(" }");
        }
        Layout::Block(depth) => {
            output.push_str("{\n");
            for property in properties {
                output.push_str(&INDENT.repeat(depth + 1));
                print_property(property, output, layout.nested());
                output.push('\n');
            }
            output.push_str(&INDENT.repeat(depth));
            output.push('}');
        }
    }
}

fn print_property(property: &ObjectProperty, output: &mut String, layout: Layout) {
    if is_bare_key(&property.key) {
        output.push_str(&property.key);
    } else {
        print_string(&property.key, output);
    }
    output.push_str(": ");
    print_expr(&property.value, output, layout);
}

fn print_array(items: &[Expression], output: &mut String, layout: Layout) {
    if items.is_empty() {
        output.push_str("[]");
        return;
    }
    match layout {
        Layout::Inline => {
            output.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    output.push_str(", ");
                }
                print_expr(item, output, layout);
            }
            output.push(']');
        }
        Layout::Block(depth) => {
            output.push_str("[\n");
            for item in items {
                output.push_str(&INDENT.repeat(depth + 1));
                print_expr(item, output, layout.nested());
                output.push('\n');
            }
            output.push_str(&INDENT.repeat(depth));
            output.push(']');
        }
    }
}

fn print_literal(literal: &Literal, output: &mut String) {
    match literal {
        Literal::String(s) => print_string(s, output),
        Literal::Integer(n) => output.push_str(&n.to_string()),
        Literal::Boolean(b) => output.push_str(if *b { "true" } else { "false" }),
        Literal::Null => output.push_str("null"),
    }
}

fn print_string(value: &str, output: &mut String) {
    output.push('\'');
    push_escaped(value, output);
    output.push('\'');
}

/// Escapes string text. `$` is escaped only where it would open a hole.
fn push_escaped(value: &str, output: &mut String) {
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' => output.push_str("\\'"),
            '\\' => output.push_str("\\\\"),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\t' => output.push_str("\\t"),
            '$' if chars.peek() == Some(&'{') => output.push_str("\\$"),
            _ => output.push(c),
        }
    }
}

/// Keys that can be written without quotes: identifiers, including keywords.
fn is_bare_key(key: &str) -> bool {
    let mut chars = key.chars();
    let starts_well = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    (starts_well && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')) || is_keyword(key)
}
