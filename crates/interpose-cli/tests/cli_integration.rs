//! Integration tests for the `interpose` binary.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};

fn interpose(args: &[&str]) -> Output {
    let dir = tempfile::tempdir().unwrap();
    interpose_in(dir.path(), args)
}

fn interpose_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_interpose"))
        .args(args)
        .env_remove("INTERPOSE_LOG")
        .current_dir(dir)
        .output()
        .expect("failed to run interpose")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_types_lists_builtins() {
    let output = interpose(&["types"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("collections.ArrayList extends lang.Object implements collections.List"));
    assert!(text.contains("collections.Stack extends collections.ArrayList"));
}

#[test]
fn test_inspect_text() {
    let output = interpose(&["inspect", "collections.Stack"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let text = stdout(&output);
    assert!(text.contains("Proxy type:   collections.Stack$$Intercepted"));
    assert!(text.contains("Strategy:     capability-interface"));
    assert!(text.contains("public pop() -> lang.Object  [collections.Stack]"));
    // final operations are never overridden
    assert!(!text.contains(" peek("));
}

#[test]
fn test_inspect_json() {
    let output = interpose(&["inspect", "collections.ArrayList", "--format", "json"]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(json["unique_name"], "collections.ArrayList$$Intercepted");
    assert_eq!(json["handler_slot"], "handler");
    assert!(json["operations"].as_array().is_some_and(|ops| !ops.is_empty()));
}

#[test]
fn test_render_with_check() {
    let output = interpose(&["render", "collections.ArrayList", "--check"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let text = stdout(&output);
    assert!(text.starts_with("// proxy for collections.ArrayList\n"));
    assert!(text.contains("init() = super#0() with passthrough;"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("compiled collections.ArrayList$$Intercepted"));
}

#[test]
fn test_config_file_sets_handler_slot() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[proxy]\nhandler_slot = \"interceptor\"").unwrap();
    let path = file.path().to_str().unwrap();

    let output = interpose(&["render", "collections.Stack", "--config", path]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("slot interceptor: handler;"));
}

#[test]
fn test_config_in_working_directory_is_picked_up() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("interpose.toml"),
        "[proxy]\nhandler_slot = \"spy\"\n",
    )
    .unwrap();

    let output = interpose_in(dir.path(), &["render", "collections.Stack"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("slot spy: handler;"));

    let output = interpose(&["render", "collections.Stack"]);
    assert!(stdout(&output).contains("slot handler: handler;"));
}

#[test]
fn test_invalid_config_is_reported() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[proxy]\nhandler_slot = \"class\"").unwrap();
    let path = file.path().to_str().unwrap();

    let output = interpose(&["types", "--config", path]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid options"));
}

#[test]
fn test_unknown_type() {
    let output = interpose(&["inspect", "demo.Missing"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown type demo.Missing"), "{stderr}");
}
