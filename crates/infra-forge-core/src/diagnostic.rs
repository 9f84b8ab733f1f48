use std::fmt;

use serde::{Deserialize, Serialize};

use crate::span::{LineIndex, Span};

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "Error"),
            Self::Warning => write!(f, "Warning"),
            Self::Info => write!(f, "Info"),
        }
    }
}

/// The pipeline stage that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    Lexical,
    Syntax,
    Binding,
    Emission,
    Decompilation,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lexical => "lexical",
            Self::Syntax => "syntax",
            Self::Binding => "binding",
            Self::Emission => "emission",
            Self::Decompilation => "decompilation",
        };
        f.write_str(name)
    }
}

/// A diagnostic anchored to a source location.
///
/// The serialized form `{ severity, message, line, column, path }` is rendered
/// directly by external tooling and must stay stable. The byte span and kind are
/// carried for in-process consumers only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub line: usize,
    pub column: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip)]
    pub kind: Option<DiagnosticKind>,
    #[serde(skip)]
    pub span: Span,
}

impl Diagnostic {
    /// Creates a diagnostic at `span`, resolving its line/column through `index`.
    pub fn new(
        severity: Severity,
        kind: DiagnosticKind,
        message: impl Into<String>,
        span: Span,
        index: &LineIndex,
    ) -> Self {
        let position = index.position(span.start);
        Self {
            severity,
            message: message.into(),
            line: position.line,
            column: position.column,
            path: None,
            kind: Some(kind),
            span,
        }
    }

    pub fn error(kind: DiagnosticKind, message: impl Into<String>, span: Span, index: &LineIndex) -> Self {
        Self::new(Severity::Error, kind, message, span, index)
    }

    pub fn warning(
        kind: DiagnosticKind,
        message: impl Into<String>,
        span: Span,
        index: &LineIndex,
    ) -> Self {
        Self::new(Severity::Warning, kind, message, span, index)
    }

    /// Creates a diagnostic that has no source text, located by a logical path instead.
    pub fn at_path(
        severity: Severity,
        kind: DiagnosticKind,
        message: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            message: message.into(),
            line: 1,
            column: 1,
            path: Some(path.into()),
            kind: Some(kind),
            span: Span::default(),
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{}) : {}: {}", self.line, self.column, self.severity, self.message)?;
        if let Some(path) = &self.path {
            write!(f, " [{path}]")?;
        }
        Ok(())
    }
}

/// Returns true if any diagnostic in `diagnostics` has error severity.
pub fn has_errors<'a>(diagnostics: impl IntoIterator<Item = &'a Diagnostic>) -> bool {
    diagnostics.into_iter().any(Diagnostic::is_error)
}
