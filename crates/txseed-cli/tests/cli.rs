use std::fs;
use std::path::PathBuf;
use std::process::Command;

fn temp_csv(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!("txseed_cli_{label}_{}.csv", uuid::Uuid::new_v4()))
}

#[test]
fn writes_csv_and_prints_preview_without_database() {
    let csv = temp_csv("run");
    let output = Command::new(env!("CARGO_BIN_EXE_txseed"))
        .args(["--no-db", "--seed", "7", "--csv"])
        .arg(&csv)
        .output()
        .expect("failed to run txseed");

    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("only showing top 5 rows"));
    assert_eq!(stdout.lines().last(), Some("100"));

    let contents = fs::read_to_string(&csv).expect("read csv");
    assert_eq!(contents.lines().count(), 101);
    assert!(contents.starts_with("id,user_id,transaction_amount,transaction_date,"));
    let _ = fs::remove_file(csv);
}

#[test]
fn same_seed_writes_identical_csv() {
    let first = temp_csv("a");
    let second = temp_csv("b");
    for path in [&first, &second] {
        let status = Command::new(env!("CARGO_BIN_EXE_txseed"))
            .args(["--no-db", "--rows", "20", "--seed", "3", "--csv"])
            .arg(path)
            .status()
            .expect("failed to run txseed");
        assert_eq!(status.code(), Some(0));
    }
    assert_eq!(
        fs::read_to_string(&first).expect("first csv"),
        fs::read_to_string(&second).expect("second csv")
    );
    let _ = fs::remove_file(first);
    let _ = fs::remove_file(second);
}

#[test]
fn invalid_row_count_fails_before_writing() {
    let csv = temp_csv("invalid");
    let output = Command::new(env!("CARGO_BIN_EXE_txseed"))
        .args(["--no-db", "--rows", "0", "--csv"])
        .arg(&csv)
        .output()
        .expect("failed to run txseed");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("rows_not_positive"));
    assert!(!csv.exists());
}

#[test]
fn dotenv_log_filter_applies_to_the_run() {
    let dir = std::env::temp_dir().join(format!("txseed_cli_env_{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create dir");
    fs::write(dir.join(".env"), "RUST_LOG=debug\n").expect("write .env");

    let output = Command::new(env!("CARGO_BIN_EXE_txseed"))
        .current_dir(&dir)
        .env_remove("RUST_LOG")
        .args(["--no-db", "--rows", "3", "--seed", "1", "--csv", "out.csv"])
        .output()
        .expect("failed to run txseed");

    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("loaded .env"), "{stderr}");
    assert!(stderr.contains("column planned"), "{stderr}");
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn emits_spec_json_schema() {
    let output = Command::new(env!("CARGO_BIN_EXE_txseed"))
        .arg("--emit-schema")
        .output()
        .expect("failed to run txseed");

    assert_eq!(output.status.code(), Some(0));
    let schema: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("schema is json");
    assert_eq!(schema["title"], "DataSpec");
}
