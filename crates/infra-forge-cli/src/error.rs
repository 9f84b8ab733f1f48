use std::path::PathBuf;

use infra_forge_compiler::{DecompileError, EmitError};

/// Exit codes for the CLI process.
///
/// - 0: success
/// - 1: general error
/// - 2: invalid arguments or configuration
/// - 3: compilation failure (error diagnostics or a fatal emission error)
/// - 4: decompilation failure (a document could not be read)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    #[allow(dead_code)]
    Success = 0,
    GeneralError = 1,
    InvalidArguments = 2,
    CompileError = 3,
    DecompileError = 4,
}

/// Errors returned by CLI command handlers.
///
/// Per-file variants are reported as they happen and processing moves on to
/// the next file; `Failed` summarizes them when the command finishes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// IO errors (file not found, permission denied).
    #[error("IO error for {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Configuration errors.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// A document could not be emitted.
    #[error("{file}: {source}")]
    Emit { file: PathBuf, source: EmitError },

    /// A document could not be decompiled.
    #[error("{file}: {source}")]
    Decompile {
        file: PathBuf,
        source: DecompileError,
    },

    /// Decompiled output would replace an existing file.
    #[error("'{path}' already exists (use --force to overwrite)")]
    OutputExists { path: PathBuf },

    /// Some of the processed files had errors.
    #[error("{failed} of {total} file(s) failed")]
    Failed {
        failed: usize,
        total: usize,
        kind: FailureKind,
    },

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

/// Which pipeline a [`CliError::Failed`] summary came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Compile,
    Decompile,
}

impl CliError {
    /// Maps this error to the appropriate exit code.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Config { .. } => ExitCode::InvalidArguments,
            Self::Emit { .. }
            | Self::Failed {
                kind: FailureKind::Compile,
                ..
            } => ExitCode::CompileError,
            Self::Decompile { .. }
            | Self::Failed {
                kind: FailureKind::Decompile,
                ..
            } => ExitCode::DecompileError,
            Self::Io { .. } | Self::OutputExists { .. } | Self::Other(_) => ExitCode::GeneralError,
        }
    }

    /// Serializes this error as a JSON value for `--format json` output.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Io { path, source } => serde_json::json!({
                "error": "io_error",
                "path": path.display().to_string(),
                "message": source.to_string(),
            }),
            Self::Config { message } => serde_json::json!({
                "error": "config_error",
                "message": message,
            }),
            Self::Emit { file, source } => serde_json::json!({
                "error": "emit_error",
                "file": file.display().to_string(),
                "message": source.to_string(),
            }),
            Self::Decompile { file, source } => serde_json::json!({
                "error": "decompile_error",
                "file": file.display().to_string(),
                "message": source.to_string(),
            }),
            Self::Failed { failed, total, .. } => serde_json::json!({
                "error": "failed",
                "failed": failed,
                "total": total,
            }),
            other => serde_json::json!({
                "error": "error",
                "message": other.to_string(),
            }),
        }
    }
}
