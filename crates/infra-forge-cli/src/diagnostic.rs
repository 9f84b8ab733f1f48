use std::fmt::Display;

use infra_forge_core::{Diagnostic, DiagnosticKind, Severity};
use miette::{LabeledSpan, NamedSource, SourceCode, SourceSpan};

/// A compiler diagnostic prepared for rich miette rendering.
///
/// Severity comes from the diagnostic itself, so the miette trait is
/// implemented by hand rather than derived.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct SourceDiagnostic {
    src: NamedSource<String>,
    span: SourceSpan,
    message: String,
    label: String,
    severity: miette::Severity,
    code: Option<String>,
    suggestion: Option<String>,
}

impl miette::Diagnostic for SourceDiagnostic {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.code
            .as_ref()
            .map(|code| Box::new(code) as Box<dyn Display + 'a>)
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(self.severity)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.suggestion
            .as_ref()
            .map(|help| Box::new(help) as Box<dyn Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(&self.src)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            Some(self.label.clone()),
            self.span,
        ))))
    }
}

/// Convert a compiler `Diagnostic` into a miette `SourceDiagnostic`.
pub fn to_source_diagnostic(
    diagnostic: &Diagnostic,
    source: &str,
    filename: &str,
) -> SourceDiagnostic {
    let start = diagnostic.span.start.min(source.len());
    let length = diagnostic.span.len().min(source.len() - start);

    SourceDiagnostic {
        src: NamedSource::new(filename, source.to_string()),
        span: (start, length).into(),
        message: diagnostic.message.clone(),
        label: label_for(diagnostic.kind).to_string(),
        severity: match diagnostic.severity {
            Severity::Error => miette::Severity::Error,
            Severity::Warning => miette::Severity::Warning,
            Severity::Info => miette::Severity::Advice,
        },
        code: diagnostic.kind.map(|kind| format!("infra_forge::{kind}")),
        suggestion: suggestion_for(&diagnostic.message),
    }
}

/// Render one diagnostic as a printable miette report.
pub fn render_diagnostic(diagnostic: &Diagnostic, source: &str, filename: &str) -> miette::Report {
    miette::Report::new(to_source_diagnostic(diagnostic, source, filename))
}

fn label_for(kind: Option<DiagnosticKind>) -> &'static str {
    match kind {
        Some(DiagnosticKind::Lexical) => "unrecognized input",
        Some(DiagnosticKind::Syntax) => "syntax error here",
        Some(DiagnosticKind::Binding) => "in this expression",
        Some(DiagnosticKind::Emission) => "cannot be emitted",
        Some(DiagnosticKind::Decompilation) | None => "here",
    }
}

/// Suggestions for the messages a user can usually fix in one step.
fn suggestion_for(message: &str) -> Option<String> {
    if message.ends_with("is not declared") {
        Some("Declare it with 'parameter', 'variable' or 'resource', or check the spelling.".into())
    } else if message.contains("is declared more than once") {
        Some("Rename one of the declarations.".into())
    } else if message.contains("reference cycle") || message.ends_with("references itself") {
        Some("Break the cycle by removing one of the references.".into())
    } else if message.starts_with("unknown type") {
        Some("Use one of the listed type names.".into())
    } else if message.contains("is missing the required 'name' property") {
        Some("Add a 'name' property to the resource body.".into())
    } else {
        None
    }
}
