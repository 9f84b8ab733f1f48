use std::path::Path;

use infra_forge_compiler::{compile, emit_for_deployment, EmitError};

use crate::cli::BuildArgs;
use crate::commands::{failure_report, file_report, finish, output_path, read_input, write_output};
use crate::config::Settings;
use crate::error::{CliError, FailureKind};
use crate::output::{tally, OutputContext, OutputMode};

/// What happened to one source file.
struct Built {
    report: serde_json::Value,
    document: Option<serde_json::Value>,
    failed: bool,
}

/// Run the `build` command: compile each file and write its document.
pub fn run(args: BuildArgs, settings: &Settings, output: &OutputContext) -> Result<(), CliError> {
    let out_dir = args.out_dir.as_deref().or(settings.out_dir.as_deref());

    let mut reports = Vec::new();
    let mut documents = Vec::new();
    let mut failed = 0usize;

    for file in &args.files {
        let built = match build_file(file, out_dir, args.stdout, output) {
            Ok(built) => built,
            Err(err) => {
                output.print_error(&err);
                Built {
                    report: failure_report(file, &err),
                    document: None,
                    failed: true,
                }
            }
        };
        if built.failed {
            failed += 1;
        }
        reports.push(built.report);
        if let Some(document) = built.document {
            documents.push(document);
        }
    }

    match output.mode {
        OutputMode::Json => {
            let mut summary = serde_json::json!({
                "files": args.files.len(),
                "failed": failed,
                "results": reports,
            });
            if args.stdout {
                summary["documents"] = serde_json::Value::Array(documents);
            }
            output.print_json(&summary);
        }
        _ => {
            if args.stdout {
                print_documents(documents);
            }
            if failed == 0 {
                output.success(&format!("compiled {} file(s)", args.files.len()));
            } else {
                output.warn(&format!(
                    "{failed} of {} file(s) failed to compile",
                    args.files.len()
                ));
            }
        }
    }

    finish(failed, args.files.len(), FailureKind::Compile)
}

fn build_file(
    file: &Path,
    out_dir: Option<&Path>,
    to_stdout: bool,
    output: &OutputContext,
) -> Result<Built, CliError> {
    let source = read_input(file)?;
    let model = compile(&source);
    output.diagnostics(file, Some(&source), model.diagnostics());
    let mut report = file_report(file, model.diagnostics());

    let emission = match emit_for_deployment(&model) {
        Ok(emission) => emission,
        Err(EmitError::ModelHasErrors { diagnostics }) => {
            let (errors, _) = tally(&diagnostics);
            tracing::info!(file = %file.display(), errors, "skipped emission");
            return Ok(Built {
                report,
                document: None,
                failed: true,
            });
        }
        Err(source) => {
            return Err(CliError::Emit {
                file: file.to_path_buf(),
                source,
            });
        }
    };

    if to_stdout {
        return Ok(Built {
            report,
            document: Some(emission.document),
            failed: false,
        });
    }

    let text = emission.to_json_string().map_err(|source| CliError::Emit {
        file: file.to_path_buf(),
        source,
    })?;
    let target = output_path(file, out_dir, "json");
    write_output(&target, &text)?;
    tracing::info!(file = %file.display(), output = %target.display(), "compiled");

    match output.mode {
        OutputMode::Plain => println!("{}\t{}", file.display(), target.display()),
        _ => output.status(&format!("  {} -> {}", file.display(), target.display())),
    }
    report["output"] = serde_json::Value::String(target.display().to_string());

    Ok(Built {
        report,
        document: None,
        failed: false,
    })
}

/// One document prints as itself; several print as an array.
fn print_documents(mut documents: Vec<serde_json::Value>) {
    let value = match documents.len() {
        0 => return,
        1 => documents.remove(0),
        _ => serde_json::Value::Array(documents),
    };
    if let Ok(text) = serde_json::to_string_pretty(&value) {
        println!("{text}");
    }
}
