mod common;

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use common::write_intents;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_malformed_csv_handling() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("robustness.csv");
    write_intents(
        &input,
        &[
            // Valid intent
            ["Coffee", "", "0.001", "addr1", "", "approved", ""],
            // Unknown decision
            ["Tea", "", "0.001", "addr1", "", "maybe", ""],
            // Valid intent again
            ["Cake", "", "0.003", "addr3", "", "approved", ""],
        ],
    )
    .unwrap();

    let mut cmd = Command::new(cargo_bin!("ap2"));
    cmd.arg(&input);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error reading intent"))
        .stdout(predicate::str::contains(",0.001,addr1,approved,success,"))
        .stdout(predicate::str::contains(",0.003,addr3,approved,success,"));
}

#[test]
fn test_invalid_amounts_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("amounts.csv");
    write_intents(
        &input,
        &[
            ["Free lunch", "", "0", "addr1", "", "approved", ""],
            ["Refund", "", "-1", "addr1", "", "approved", ""],
            ["Garbage", "", "abc", "addr1", "", "approved", ""],
            ["Coffee", "", "0.001", "addr1", "", "approved", ""],
        ],
    )
    .unwrap();

    let mut cmd = Command::new(cargo_bin!("ap2"));
    cmd.arg(&input);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error processing intent at row 1"))
        .stderr(predicate::str::contains("Error processing intent at row 3"))
        .stdout(predicate::str::contains(",0.001,addr1,approved,success,"))
        .stdout(predicate::str::contains("Free lunch").not());
}

#[test]
fn test_missing_input_file_fails() {
    let mut cmd = Command::new(cargo_bin!("ap2"));
    cmd.arg("does-not-exist.csv");

    cmd.assert().failure();
}

#[test]
fn test_out_of_range_cart_ttl_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("intents.csv");
    write_intents(&input, &[["Coffee", "", "0.001", "addr1", "", "approved", ""]]).unwrap();
    let config = dir.path().join("config.json");
    std::fs::write(&config, r#"{"cart_ttl_secs": 18446744073709551615}"#).unwrap();

    let mut cmd = Command::new(cargo_bin!("ap2"));
    cmd.arg(&input).arg("--config").arg(&config);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
}
