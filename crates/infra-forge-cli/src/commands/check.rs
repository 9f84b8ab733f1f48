use infra_forge_compiler::compile;

use crate::cli::CheckArgs;
use crate::commands::{failure_report, file_report, finish, read_input};
use crate::error::{CliError, FailureKind};
use crate::output::{tally, OutputContext, OutputMode};

/// Run the `check` command: parse and bind each file and report diagnostics.
pub fn run(args: CheckArgs, output: &OutputContext) -> Result<(), CliError> {
    let mut reports = Vec::new();
    let mut failed = 0usize;
    let mut total_errors = 0usize;
    let mut total_warnings = 0usize;

    for file in &args.files {
        let source = match read_input(file) {
            Ok(source) => source,
            Err(err) => {
                output.print_error(&err);
                reports.push(failure_report(file, &err));
                failed += 1;
                continue;
            }
        };

        let model = compile(&source);
        let diagnostics = model.diagnostics();
        output.diagnostics(file, Some(&source), diagnostics);
        let (errors, warnings) = tally(diagnostics);
        tracing::info!(file = %file.display(), errors, warnings, "checked");

        total_errors += errors;
        total_warnings += warnings;
        if errors > 0 {
            failed += 1;
        }
        reports.push(file_report(file, diagnostics));
    }

    let summary = format!(
        "{} file(s) checked, {total_errors} error(s), {total_warnings} warning(s)",
        args.files.len()
    );
    match output.mode {
        OutputMode::Json => output.print_json(&serde_json::json!({
            "files": args.files.len(),
            "errors": total_errors,
            "warnings": total_warnings,
            "results": reports,
        })),
        OutputMode::Plain => println!("{}\t{total_errors}\t{total_warnings}", args.files.len()),
        OutputMode::Human | OutputMode::Rich => {
            if failed == 0 {
                output.success(&summary);
            } else {
                output.warn(&summary);
            }
        }
    }

    finish(failed, args.files.len(), FailureKind::Compile)
}
