use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const GREETING: &str =
    "parameter name: string\nvariable greeting = concat('hello ', name)\noutput result = greeting\n";

const UNDECLARED: &str =
    "parameter name: string\nvariable greeting = concat('hello ', missing)\noutput result = greeting\n";

/// The binary, run inside `dir` with no ambient configuration.
#[allow(deprecated)]
fn infra_forge(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("infra-forge").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join("xdg"))
        .env_remove("INFRA_FORGE_CONFIG")
        .env_remove("INFRA_FORGE_LOG")
        .env_remove("NO_COLOR");
    cmd
}

fn workspace(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, contents) in files {
        fs::write(dir.path().join(name), contents).unwrap();
    }
    dir
}

// ---------------------------------------------------------------------------
// Help, version and completions
// ---------------------------------------------------------------------------

#[test]
fn help_exits_zero() {
    let dir = workspace(&[]);
    infra_forge(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Compiler and decompiler"));
}

#[test]
fn version_exits_zero() {
    let dir = workspace(&[]);
    infra_forge(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("infra-forge"));
}

#[test]
fn build_help() {
    let dir = workspace(&[]);
    infra_forge(dir.path())
        .args(["build", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Compile .infra files"));
}

#[test]
fn completions_bash() {
    let dir = workspace(&[]);
    infra_forge(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn completions_ignore_broken_config() {
    let dir = workspace(&[("infra-forge.toml", "[output\n")]);
    infra_forge(dir.path())
        .args(["completions", "zsh"])
        .assert()
        .success();
}

#[test]
fn completions_invalid_shell_rejected() {
    let dir = workspace(&[]);
    infra_forge(dir.path())
        .args(["completions", "tcsh"])
        .assert()
        .failure();
}

// ---------------------------------------------------------------------------
// build
// ---------------------------------------------------------------------------

#[test]
fn build_writes_json_next_to_source() {
    let dir = workspace(&[("main.infra", GREETING)]);
    infra_forge(dir.path())
        .args(["build", "main.infra"])
        .assert()
        .success()
        .stderr(predicate::str::contains("main.infra -> main.json"));

    let text = fs::read_to_string(dir.path().join("main.json")).unwrap();
    let document: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
        document["variables"]["greeting"],
        "[concat('hello ', parameters('name'))]"
    );
    assert_eq!(document["outputs"]["result"]["type"], "string");
    assert!(text.ends_with("}\n"));
}

#[test]
fn build_to_stdout_single_document() {
    let dir = workspace(&[("main.infra", GREETING)]);
    let assert = infra_forge(dir.path())
        .args(["build", "--stdout", "main.infra"])
        .assert()
        .success();
    let document: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(document["contentVersion"], "1.0.0.0");
    assert!(!dir.path().join("main.json").exists());
}

#[test]
fn build_to_stdout_several_documents_as_array() {
    let dir = workspace(&[("a.infra", GREETING), ("b.infra", "variable x = 1\n")]);
    let assert = infra_forge(dir.path())
        .args(["build", "--stdout", "a.infra", "b.infra"])
        .assert()
        .success();
    let documents: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).unwrap();
    let documents = documents.as_array().unwrap();
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[1]["variables"]["x"], 1);
}

#[test]
fn build_with_errors_exits_nonzero_and_writes_nothing() {
    let dir = workspace(&[("main.infra", UNDECLARED)]);
    infra_forge(dir.path())
        .args(["build", "main.infra"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("main.infra(2,"))
        .stderr(predicate::str::contains("'missing' is not declared"));
    assert!(!dir.path().join("main.json").exists());
}

#[test]
fn build_continues_after_a_failing_file() {
    let dir = workspace(&[("bad.infra", UNDECLARED), ("good.infra", GREETING)]);
    infra_forge(dir.path())
        .args(["build", "bad.infra", "good.infra"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("1 of 2 file(s) failed"));
    assert!(dir.path().join("good.json").exists());
    assert!(!dir.path().join("bad.json").exists());
}

#[test]
fn build_warnings_do_not_fail() {
    let dir = workspace(&[(
        "main.infra",
        "resource s: 'Microsoft.Storage/storageAccounts@2019-06-01' = {\n  name: 'st'\n}\noutput endpoint = s.properties.primaryEndpoints\n",
    )]);
    infra_forge(dir.path())
        .args(["build", "main.infra"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Warning"));
}

#[test]
fn build_missing_file_fails() {
    let dir = workspace(&[]);
    infra_forge(dir.path())
        .args(["build", "absent.infra"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.infra"));
}

#[test]
fn build_out_dir_flag() {
    let dir = workspace(&[("main.infra", GREETING)]);
    infra_forge(dir.path())
        .args(["build", "-o", "dist", "main.infra"])
        .assert()
        .success();
    assert!(dir.path().join("dist/main.json").exists());
}

#[test]
fn build_out_dir_from_config() {
    let dir = workspace(&[
        ("main.infra", GREETING),
        ("infra-forge.toml", "[build]\nout_dir = \"generated\"\n"),
    ]);
    infra_forge(dir.path())
        .args(["build", "main.infra"])
        .assert()
        .success();
    assert!(dir.path().join("generated/main.json").exists());
}

#[test]
fn build_json_report() {
    let dir = workspace(&[("main.infra", UNDECLARED)]);
    let assert = infra_forge(dir.path())
        .args(["--format", "json", "build", "main.infra"])
        .assert()
        .code(3);
    let report: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(report["failed"], 1);
    let result = &report["results"][0];
    assert_eq!(result["file"], "main.infra");
    assert_eq!(result["errors"], 1);
    assert_eq!(result["diagnostics"][0]["severity"], "Error");
    assert_eq!(result["diagnostics"][0]["line"], 2);
}

#[test]
fn rich_format_renders_message() {
    let dir = workspace(&[("main.infra", UNDECLARED)]);
    infra_forge(dir.path())
        .args(["--format", "rich", "check", "main.infra"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("'missing' is not declared"));
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

#[test]
fn check_clean_file() {
    let dir = workspace(&[("main.infra", GREETING)]);
    infra_forge(dir.path())
        .args(["check", "main.infra"])
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "1 file(s) checked, 0 error(s), 0 warning(s)",
        ));
}

#[test]
fn check_reports_errors() {
    let dir = workspace(&[("main.infra", UNDECLARED)]);
    infra_forge(dir.path())
        .args(["check", "main.infra"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Error: 'missing' is not declared"));
}

#[test]
fn check_plain_summary() {
    let dir = workspace(&[("a.infra", GREETING), ("b.infra", UNDECLARED)]);
    infra_forge(dir.path())
        .args(["--format", "plain", "check", "a.infra", "b.infra"])
        .assert()
        .code(3)
        .stdout(predicate::str::contains("2\t1\t0"))
        .stderr(predicate::str::contains("b.infra\terror\t2\t"));
}

#[test]
fn check_quiet_hides_summary() {
    let dir = workspace(&[("main.infra", GREETING)]);
    infra_forge(dir.path())
        .args(["-q", "check", "main.infra"])
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}

#[test]
fn invalid_config_format_is_usage_error() {
    let dir = workspace(&[
        ("main.infra", GREETING),
        ("infra-forge.toml", "[output]\nformat = \"xml\"\n"),
    ]);
    infra_forge(dir.path())
        .args(["check", "main.infra"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown output format 'xml'"));
}

#[test]
fn explicit_missing_config_fails() {
    let dir = workspace(&[("main.infra", GREETING)]);
    infra_forge(dir.path())
        .args(["--config", "nowhere.toml", "check", "main.infra"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nowhere.toml"));
}

#[test]
fn format_flag_overrides_config() {
    let dir = workspace(&[
        ("main.infra", GREETING),
        ("infra-forge.toml", "[output]\nformat = \"json\"\n"),
    ]);
    infra_forge(dir.path())
        .args(["--format", "plain", "check", "main.infra"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1\t0\t0"));
}

// ---------------------------------------------------------------------------
// decompile
// ---------------------------------------------------------------------------

fn emitted_greeting(dir: &Path) {
    infra_forge(dir)
        .args(["build", "main.infra"])
        .assert()
        .success();
}

#[test]
fn decompile_writes_infra_source() {
    let dir = workspace(&[("main.infra", GREETING)]);
    emitted_greeting(dir.path());
    fs::remove_file(dir.path().join("main.infra")).unwrap();

    infra_forge(dir.path())
        .args(["decompile", "main.json"])
        .assert()
        .success();
    assert_eq!(
        fs::read_to_string(dir.path().join("main.infra")).unwrap(),
        "parameter name: string\n\nvariable greeting = concat('hello ', name)\n\noutput result: string = greeting\n"
    );
}

#[test]
fn decompile_refuses_to_overwrite() {
    let dir = workspace(&[("main.infra", GREETING)]);
    emitted_greeting(dir.path());

    infra_forge(dir.path())
        .args(["decompile", "main.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    assert_eq!(
        fs::read_to_string(dir.path().join("main.infra")).unwrap(),
        GREETING
    );
}

#[test]
fn decompile_help_states_overwrite_policy() {
    let dir = TempDir::new().unwrap();
    infra_forge(dir.path())
        .args(["decompile", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("never overwritten unless --force is given"));
}

#[test]
fn decompile_force_overwrites() {
    let dir = workspace(&[("main.infra", GREETING)]);
    emitted_greeting(dir.path());

    infra_forge(dir.path())
        .args(["decompile", "--force", "main.json"])
        .assert()
        .success();
    assert!(fs::read_to_string(dir.path().join("main.infra"))
        .unwrap()
        .contains("output result: string = greeting"));
}

#[test]
fn decompile_to_stdout() {
    let dir = workspace(&[(
        "t.json",
        r#"{ "parameters": { "env": { "type": "string", "defaultValue": "dev" } } }"#,
    )]);
    infra_forge(dir.path())
        .args(["decompile", "--stdout", "t.json"])
        .assert()
        .success()
        .stdout("parameter env: string = 'dev'\n");
    assert!(!dir.path().join("t.infra").exists());
}

#[test]
fn decompile_invalid_json() {
    let dir = workspace(&[("t.json", "{ not json")]);
    infra_forge(dir.path())
        .args(["decompile", "t.json"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("invalid JSON"));
}

#[test]
fn decompile_degraded_expression_warns_with_path() {
    let dir = workspace(&[(
        "t.json",
        r#"{ "variables": { "v": "[concat('a',]" } }"#,
    )]);
    infra_forge(dir.path())
        .args(["decompile", "--stdout", "t.json"])
        .assert()
        .success()
        .stderr(predicate::str::contains("[variables.v]"))
        .stdout(predicate::str::contains("variable v = '[concat(\\'a\\',]'"));
}

#[test]
fn deeply_nested_source_fails_with_a_diagnostic() {
    let source = format!("variable x = {}1{}\noutput o = 1\n", "(".repeat(20_000), ")".repeat(20_000));
    let dir = workspace(&[("deep.infra", source.as_str())]);
    infra_forge(dir.path())
        .args(["check", "deep.infra"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("expression nesting exceeds"));
}
