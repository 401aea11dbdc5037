#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

fn run(script: &Path, db_path: &Path) -> Output {
    let output = Command::new(cargo_bin!("payreq"))
        .arg(script)
        .arg("--methods")
        .arg("tests/fixtures/methods.csv")
        .arg("--orders")
        .arg("tests/fixtures/orders.csv")
        .arg("--db-path")
        .arg(db_path)
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());
    output
}

fn first_line(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.lines().next().unwrap()).unwrap()
}

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: create a request
    let mut csv1 = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv1, "op,target,body").unwrap();
    writeln!(
        csv1,
        "post,nAWw2jewpA,\"{{\"\"paymentId\"\": 10, \"\"paymentMethodCode\"\": \"\"CARD\"\"}}\""
    )
    .unwrap();

    let created = first_line(&run(csv1.path(), &db_path));
    assert_eq!(created["status"], 201);
    let hash = created["body"]["hash"].as_str().unwrap().to_string();

    // 2. Second run: the request is still there and can be processed
    let mut csv2 = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv2, "op,target,body").unwrap();
    writeln!(csv2, "get,{hash},").unwrap();
    writeln!(csv2, "process,{hash},").unwrap();

    let output = run(csv2.path(), &db_path);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<Value> = stdout.lines().map(|l| serde_json::from_str(l).unwrap()).collect();

    assert_eq!(lines[0]["status"], 200);
    assert_eq!(lines[0]["body"]["state"], "new");
    assert_eq!(lines[1]["body"]["state"], "completed");
}
