use std::path::Path;

use infra_forge_compiler::decompile_to_source;

use crate::cli::DecompileArgs;
use crate::commands::{failure_report, file_report, finish, output_path, read_input, write_output};
use crate::error::{CliError, FailureKind};
use crate::output::{OutputContext, OutputMode};

struct Decompiled {
    report: serde_json::Value,
    text: Option<String>,
    failed: bool,
}

/// Run the `decompile` command: turn each template into `.infra` source and
/// re-validate the printed text by parsing and binding it.
pub fn run(args: DecompileArgs, output: &OutputContext) -> Result<(), CliError> {
    let mut reports = Vec::new();
    let mut printed = Vec::new();
    let mut failed = 0usize;

    for file in &args.files {
        let decompiled = match decompile_file(file, &args, output) {
            Ok(decompiled) => decompiled,
            Err(err) => {
                output.print_error(&err);
                Decompiled {
                    report: failure_report(file, &err),
                    text: None,
                    failed: true,
                }
            }
        };
        if decompiled.failed {
            failed += 1;
        }
        reports.push(decompiled.report);
        if let Some(text) = decompiled.text {
            printed.push((file.as_path(), text));
        }
    }

    match output.mode {
        OutputMode::Json => {
            if args.stdout {
                for (report, (_, text)) in reports
                    .iter_mut()
                    .filter(|r| r.get("failure").is_none())
                    .zip(&printed)
                {
                    report["source"] = serde_json::Value::String(text.clone());
                }
            }
            output.print_json(&serde_json::json!({
                "files": args.files.len(),
                "failed": failed,
                "results": reports,
            }));
        }
        _ => {
            let headers = printed.len() > 1;
            for (file, text) in &printed {
                if headers {
                    println!("// {}", file.display());
                }
                print!("{text}");
            }
            if failed == 0 {
                output.success(&format!("decompiled {} file(s)", args.files.len()));
            } else {
                output.warn(&format!(
                    "{failed} of {} file(s) failed to decompile",
                    args.files.len()
                ));
            }
        }
    }

    finish(failed, args.files.len(), FailureKind::Decompile)
}

fn decompile_file(
    file: &Path,
    args: &DecompileArgs,
    output: &OutputContext,
) -> Result<Decompiled, CliError> {
    let target = output_path(file, None, "infra");
    if !args.stdout && !args.force && target.exists() {
        return Err(CliError::OutputExists { path: target });
    }

    let json = read_input(file)?;
    let result = decompile_to_source(&json).map_err(|source| CliError::Decompile {
        file: file.to_path_buf(),
        source,
    })?;
    // Document warnings point into the JSON; the rest come from binding the printed text.
    let (located, regenerated): (Vec<_>, Vec<_>) = result
        .diagnostics
        .iter()
        .cloned()
        .partition(|d| d.path.is_some());
    output.diagnostics(file, None, &located);
    output.diagnostics(&target, Some(&result.text), &regenerated);
    let mut report = file_report(file, &result.diagnostics);
    let failed = result.has_errors();

    if args.stdout {
        return Ok(Decompiled {
            report,
            text: Some(result.text),
            failed,
        });
    }

    write_output(&target, &result.text)?;
    tracing::info!(file = %file.display(), output = %target.display(), "decompiled");
    match output.mode {
        OutputMode::Plain => println!("{}\t{}", file.display(), target.display()),
        _ => output.status(&format!("  {} -> {}", file.display(), target.display())),
    }
    report["output"] = serde_json::Value::String(target.display().to_string());

    Ok(Decompiled {
        report,
        text: None,
        failed,
    })
}
