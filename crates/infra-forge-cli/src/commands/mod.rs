pub mod build;
pub mod check;
pub mod completions;
pub mod decompile;

use std::path::{Path, PathBuf};

use infra_forge_core::Diagnostic;

use crate::error::{CliError, FailureKind};
use crate::output::tally;

/// Read one input file.
pub fn read_input(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|e| CliError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write one output file, creating its directory when needed.
pub fn write_output(path: &Path, contents: &str) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| CliError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    std::fs::write(path, contents).map_err(|e| CliError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    tracing::debug!(path = %path.display(), bytes = contents.len(), "wrote output");
    Ok(())
}

/// `<file>.<extension>`, placed in `out_dir` when one is given.
pub fn output_path(file: &Path, out_dir: Option<&Path>, extension: &str) -> PathBuf {
    let target = file.with_extension(extension);
    match out_dir {
        Some(dir) => dir.join(target.file_name().unwrap_or_default()),
        None => target,
    }
}

/// Per-file entry of a `--format json` report.
pub fn file_report(file: &Path, diagnostics: &[Diagnostic]) -> serde_json::Value {
    let (errors, warnings) = tally(diagnostics);
    serde_json::json!({
        "file": file.display().to_string(),
        "errors": errors,
        "warnings": warnings,
        "diagnostics": diagnostics,
    })
}

/// Per-file entry for a file that failed before producing diagnostics.
pub fn failure_report(file: &Path, err: &CliError) -> serde_json::Value {
    serde_json::json!({
        "file": file.display().to_string(),
        "failure": err.to_json(),
    })
}

/// The command result once every file has been processed.
pub fn finish(failed: usize, total: usize, kind: FailureKind) -> Result<(), CliError> {
    if failed == 0 {
        Ok(())
    } else {
        Err(CliError::Failed {
            failed,
            total,
            kind,
        })
    }
}
