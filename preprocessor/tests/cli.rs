// Command-line tests for the `jsfxpp` binary.
//
// Each test writes a source file into a temporary directory, runs the binary
// and checks the exit status, the output file and stderr.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const BANNER: &str = "/* Generated by: JSFX Pre-Processor */";

fn jsfxpp_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_jsfxpp"))
}

fn write_source(dir: &TempDir, source: &str) -> PathBuf {
    let path = dir.path().join("effect.jsfx-inc.pp");
    std::fs::write(&path, source).expect("failed to write source");
    path
}

fn run_jsfxpp(input: &Path, output: &Path, extra: &[&str]) -> Output {
    Command::new(jsfxpp_binary())
        .arg(input)
        .arg(output)
        .args(extra)
        .output()
        .expect("failed to run jsfxpp")
}

fn assert_success(out: &Output) {
    assert!(
        out.status.success(),
        "jsfxpp failed\nstderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );
}

// ── Argument handling ───────────────────────────────────────────────────────

#[test]
fn missing_arguments_print_usage() {
    let out = Command::new(jsfxpp_binary())
        .output()
        .expect("failed to run jsfxpp");
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Usage"), "stderr: {}", stderr);
}

#[test]
fn unreadable_input_exits_with_io_status() {
    let dir = TempDir::new().unwrap();
    let out = run_jsfxpp(
        &dir.path().join("missing.pp"),
        &dir.path().join("out.jsfx"),
        &[],
    );
    assert_eq!(out.status.code(), Some(2));
    assert!(!dir.path().join("out.jsfx").exists());
}

// ── Output ──────────────────────────────────────────────────────────────────

#[test]
fn output_starts_with_banner() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "{#i=1,3}X{i}{#}");
    let output = dir.path().join("out.jsfx");

    let out = run_jsfxpp(&input, &output, &[]);
    assert_success(&out);
    let text = std::fs::read_to_string(&output).unwrap();
    assert_eq!(text, format!("{}\nX1X2X3", BANNER));
}

#[test]
fn no_banner_writes_bare_output() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "k#a k#b k#");
    let output = dir.path().join("out.jsfx");

    let out = run_jsfxpp(&input, &output, &["--no-banner"]);
    assert_success(&out);
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "0/*k:a*/ 1/*k:b*/ 2/*k: a, b*/"
    );
}

#[test]
fn error_exits_nonzero_without_output() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "function {g}(a)\n{g}foo\n{g2}foo\n");
    let output = dir.path().join("out.jsfx");

    let out = run_jsfxpp(&input, &output, &[]);
    assert_eq!(out.status.code(), Some(1));
    assert!(!output.exists(), "no output file may be written on error");
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("E0201"), "stderr: {}", stderr);
    assert!(stderr.contains("{g2}foo"), "stderr: {}", stderr);
}

// ── Warnings ────────────────────────────────────────────────────────────────

#[test]
fn uncounted_group_warns_but_succeeds() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "x = mode#a;");
    let output = dir.path().join("out.jsfx");

    let out = run_jsfxpp(&input, &output, &[]);
    assert_success(&out);
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("W0101"), "stderr: {}", stderr);
    assert!(output.exists());
}

#[test]
fn deny_warnings_fails_on_uncounted_group() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "x = mode#a;");
    let output = dir.path().join("out.jsfx");

    let out = run_jsfxpp(&input, &output, &["--deny-warnings"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(!output.exists());
}

// ── Intermediate stages ─────────────────────────────────────────────────────

#[test]
fn emit_sequences_stops_after_range_expansion() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "{#i=0,1}k#vi {#}k#");
    let output = dir.path().join("out.txt");

    let out = run_jsfxpp(&input, &output, &["--emit", "sequences"]);
    assert_success(&out);
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "k#v0 k#v1 k#");
}

#[test]
fn emit_enums_leaves_dispatch_syntax() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "function {g}()\nx = {g}f; y = k#a; n = k#;");
    let output = dir.path().join("out.txt");

    let out = run_jsfxpp(&input, &output, &["--emit", "enums"]);
    assert_success(&out);
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "function {g}()\nx = {g}f; y = 0/*k:a*/; n = 1/*k: a*/;"
    );
}

#[test]
fn emit_symbols_writes_json_tables() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "function {g}(a, b*)\nx = {g}f;\ny = k#a; n = k#;");
    let output = dir.path().join("symbols.json");

    let out = run_jsfxpp(&input, &output, &["--emit", "symbols"]);
    assert_success(&out);
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(json["enums"][0]["group"], "k");
    assert_eq!(json["enums"][0]["count"], 1);
    assert_eq!(json["dispatch"][0]["group"], "g");
    assert_eq!(json["dispatch"][0]["parameters"], serde_json::json!(["a", "b*"]));
    assert_eq!(json["dispatch"][0]["functions"][0]["name"], "f");
    assert_eq!(json["dispatch"][0]["functions"][0]["id"], 1);
}

#[test]
fn emit_build_info_is_reproducible() {
    let dir = TempDir::new().unwrap();
    let input = write_source(&dir, "k#a k#");
    let first = dir.path().join("a.json");
    let second = dir.path().join("b.json");

    assert_success(&run_jsfxpp(&input, &first, &["--emit", "build-info"]));
    assert_success(&run_jsfxpp(&input, &second, &["--emit", "build-info"]));

    let a = std::fs::read_to_string(&first).unwrap();
    let b = std::fs::read_to_string(&second).unwrap();
    assert_eq!(a, b, "build-info differs between identical runs");

    let json: serde_json::Value = serde_json::from_str(&a).unwrap();
    assert_eq!(json["source_hash"].as_str().map(str::len), Some(64));
    assert_eq!(json["preprocessor_version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn identical_inputs_produce_identical_outputs() {
    let dir = TempDir::new().unwrap();
    let input = write_source(
        &dir,
        "{#v=0,3}x_v = st#s_v;\n{#}n = st#;\nfunction {f}(a)\n{#v=0,3}h_v = {f}impl_v;\n{#}",
    );
    let first = dir.path().join("a.jsfx");
    let second = dir.path().join("b.jsfx");

    assert_success(&run_jsfxpp(&input, &first, &[]));
    assert_success(&run_jsfxpp(&input, &second, &[]));
    assert_eq!(
        std::fs::read(&first).unwrap(),
        std::fs::read(&second).unwrap()
    );
}
