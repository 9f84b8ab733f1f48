use std::path::Path;

use console::{Style, Term};
use infra_forge_core::{Diagnostic, Severity};

use crate::config::Settings;
use crate::diagnostic::render_diagnostic;
use crate::error::CliError;

/// Output format mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// One colored line per diagnostic.
    Human,
    /// Source snippets rendered by miette.
    Rich,
    /// A JSON report on stdout.
    Json,
    /// Tab-separated lines for scripts.
    Plain,
}

impl OutputMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "human" => Some(Self::Human),
            "rich" => Some(Self::Rich),
            "json" => Some(Self::Json),
            "plain" => Some(Self::Plain),
            _ => None,
        }
    }

    fn is_interactive(self) -> bool {
        matches!(self, Self::Human | Self::Rich)
    }
}

/// Output context derived from resolved settings.
///
/// Provides methods for printing success, warning, error, and JSON
/// messages respecting the chosen output mode and color settings.
pub struct OutputContext {
    pub mode: OutputMode,
    pub quiet: bool,
    pub use_color: bool,
}

impl OutputContext {
    pub fn new(settings: &Settings, quiet: bool) -> Self {
        let use_color = settings.color
            && std::env::var("TERM").map_or(true, |t| t != "dumb")
            && Term::stderr().is_term();

        Self {
            mode: settings.format,
            quiet,
            use_color,
        }
    }

    /// Context used before configuration has been resolved.
    pub fn fallback() -> Self {
        Self {
            mode: OutputMode::Human,
            quiet: false,
            use_color: false,
        }
    }

    /// Print a success message to stderr (human modes only, not in quiet mode).
    pub fn success(&self, msg: &str) {
        if self.quiet || !self.mode.is_interactive() {
            return;
        }
        if self.use_color {
            let style = Style::new().green().bold();
            eprintln!("{} {}", style.apply_to("ok"), msg);
        } else {
            eprintln!("ok {msg}");
        }
    }

    /// Print a warning to stderr (not in quiet mode).
    pub fn warn(&self, msg: &str) {
        if self.quiet {
            return;
        }
        match self.mode {
            OutputMode::Human | OutputMode::Rich => {
                if self.use_color {
                    let style = Style::new().yellow().bold();
                    eprintln!("{} {}", style.apply_to("warning:"), msg);
                } else {
                    eprintln!("warning: {msg}");
                }
            }
            OutputMode::Json => {
                let json = serde_json::json!({ "warning": msg });
                eprintln!("{json}");
            }
            OutputMode::Plain => {
                eprintln!("warning\t{msg}");
            }
        }
    }

    /// Print an error using the appropriate output mode.
    pub fn print_error(&self, err: &CliError) {
        match self.mode {
            OutputMode::Human | OutputMode::Rich => {
                if self.use_color {
                    let style = Style::new().red().bold();
                    eprintln!("{} {}", style.apply_to("error:"), err);
                } else {
                    eprintln!("error: {err}");
                }
            }
            OutputMode::Json => {
                let json = err.to_json();
                eprintln!("{json}");
            }
            OutputMode::Plain => {
                eprintln!("error\t{err}");
            }
        }
    }

    /// Print JSON data to stdout.
    pub fn print_json(&self, value: &serde_json::Value) {
        if let Ok(s) = serde_json::to_string_pretty(value) {
            println!("{s}");
        }
    }

    /// Print a status message to stderr (human modes only, not in quiet mode).
    pub fn status(&self, msg: &str) {
        if self.quiet || !self.mode.is_interactive() {
            return;
        }
        eprintln!("{msg}");
    }

    /// Print the diagnostics of one file to stderr.
    ///
    /// `source` enables snippets in rich mode; diagnostics located by a
    /// document path rather than a span are printed as lines. JSON mode
    /// prints nothing here because commands fold diagnostics into their
    /// report.
    pub fn diagnostics(&self, file: &Path, source: Option<&str>, diagnostics: &[Diagnostic]) {
        let file_name = file.display().to_string();
        for diagnostic in diagnostics {
            if self.quiet && !diagnostic.is_error() {
                continue;
            }
            match (self.mode, source) {
                (OutputMode::Json, _) => {}
                (OutputMode::Rich, Some(text)) if diagnostic.path.is_none() => {
                    let report = render_diagnostic(diagnostic, text, &file_name);
                    eprintln!("{report:?}");
                }
                (OutputMode::Plain, _) => eprintln!("{}", plain_line(&file_name, diagnostic)),
                _ => eprintln!("{}", self.human_line(&file_name, diagnostic)),
            }
        }
    }

    fn human_line(&self, file_name: &str, diagnostic: &Diagnostic) -> String {
        let line = format!("{file_name}{diagnostic}");
        if !self.use_color {
            return line;
        }
        let style = match diagnostic.severity {
            Severity::Error => Style::new().red(),
            Severity::Warning => Style::new().yellow(),
            Severity::Info => Style::new().cyan(),
        };
        style.apply_to(line).to_string()
    }
}

fn plain_line(file_name: &str, diagnostic: &Diagnostic) -> String {
    format!(
        "{file_name}\t{}\t{}\t{}\t{}\t{}",
        diagnostic.severity.to_string().to_lowercase(),
        diagnostic.line,
        diagnostic.column,
        diagnostic.path.as_deref().unwrap_or(""),
        diagnostic.message
    )
}

/// Counts error and warning diagnostics.
pub fn tally(diagnostics: &[Diagnostic]) -> (usize, usize) {
    diagnostics.iter().fold((0, 0), |(errors, warnings), d| match d.severity {
        Severity::Error => (errors + 1, warnings),
        Severity::Warning => (errors, warnings + 1),
        Severity::Info => (errors, warnings),
    })
}
