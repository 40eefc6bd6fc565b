//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Path to the built shepherd binary
pub fn shepherd_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_shepherd"))
}

/// Run the shepherd binary in `dir` with plain, uncolored output
pub fn run_shepherd_in_dir(dir: &Path, args: &[&str]) -> Output {
    Command::new(shepherd_binary())
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env("SHEPHERD_ASCII", "1")
        .env("SHEPHERD_MAX_WIDTH", "200")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute shepherd binary")
}

/// Run the binary and feed `input` to its standard input
pub fn run_shepherd_with_input(dir: &Path, args: &[&str], input: &str) -> Output {
    use std::io::Write;
    use std::process::Stdio;

    let mut child = Command::new(shepherd_binary())
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env("SHEPHERD_ASCII", "1")
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn shepherd binary");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(input.as_bytes())
        .expect("Failed to write stdin");
    child.wait_with_output().expect("Failed to wait for shepherd")
}

/// Location of the board snapshot created by `init`
pub fn board_path(dir: &Path) -> PathBuf {
    dir.join(".shepherd").join("board.json")
}

/// A snapshot issue entry in `acme/widgets`
pub fn issue(number: u64, title: &str, body: &str) -> Value {
    json!({
        "owner": "acme",
        "repo": "widgets",
        "number": number,
        "title": title,
        "body": body,
    })
}

/// Like [`issue`], with a tracked item carrying `status`
pub fn tracked_issue(number: u64, title: &str, body: &str, status: &str) -> Value {
    let mut value = issue(number, title, body);
    value["item"] = json!({
        "id": format!("item-{number}"),
        "fields": { "Status": status },
    });
    value
}

/// Append `issues` to the snapshot created by `init`
pub fn seed_board(dir: &Path, issues: Vec<Value>) {
    let path = board_path(dir);
    let content = std::fs::read_to_string(&path).expect("Failed to read board snapshot");
    let mut snapshot: Value = serde_json::from_str(&content).expect("Invalid board snapshot");
    snapshot["issues"] = Value::Array(issues);
    std::fs::write(&path, serde_json::to_string_pretty(&snapshot).unwrap())
        .expect("Failed to write board snapshot");
}

/// Current value of `field` on issue `number`, read back from the snapshot
pub fn board_field(dir: &Path, number: u64, field: &str) -> Option<String> {
    let content = std::fs::read_to_string(board_path(dir)).expect("Failed to read board snapshot");
    let snapshot: Value = serde_json::from_str(&content).expect("Invalid board snapshot");
    snapshot["issues"]
        .as_array()?
        .iter()
        .find(|issue| issue["number"] == number)?
        .get("item")?
        .get("fields")?
        .get(field)?
        .as_str()
        .map(ToString::to_string)
}
