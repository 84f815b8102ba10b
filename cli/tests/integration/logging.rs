//! Logging output tests for the purge CLI.

#[path = "../common/mod.rs"]
mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use common::LogFixture;
use predicates::prelude::*;
use std::fs;

#[test]
fn test_log_file_receives_events() {
    let fx = LogFixture::with_content("abc");
    let log_file = fx.path("purge-run.txt");

    let mut cmd = cargo_bin_cmd!("purge");
    cmd.arg("-t")
        .arg(&fx.log)
        .args(["-s", "0", "-l", "info", "--nostderr", "-o"])
        .arg(&log_file)
        .assert()
        .success()
        .stderr(predicate::str::is_empty());

    let written = fs::read_to_string(&log_file).unwrap();
    assert!(written.contains("copied to"), "log was: {written}");
    assert!(written.contains("purged"), "log was: {written}");
    assert!(written.lines().all(|l| l.starts_with('[') || l.starts_with("| ")));
}

#[test]
fn test_multiple_log_files_are_appended() {
    let fx = LogFixture::with_content("abc");
    let first = fx.path("first.txt");
    let second = fx.path("second.txt");
    fs::write(&first, "previous line\n").unwrap();

    let mut cmd = cargo_bin_cmd!("purge");
    cmd.arg("-t")
        .arg(&fx.log)
        .args(["-s", "0", "-l", "info", "-o"])
        .arg(&first)
        .arg(&second)
        .assert()
        .success();

    let first = fs::read_to_string(&first).unwrap();
    assert!(first.starts_with("previous line\n"));
    assert!(first.contains("purged"));
    assert!(fs::read_to_string(&second).unwrap().contains("purged"));
}

#[test]
fn test_unopenable_log_file_is_reported_and_run_continues() {
    let fx = LogFixture::with_content("abc");
    let not_a_file = fx.path("logs");
    fs::create_dir(&not_a_file).unwrap();

    let mut cmd = cargo_bin_cmd!("purge");
    cmd.arg("-t")
        .arg(&fx.log)
        .args(["-s", "0", "-o"])
        .arg(&not_a_file)
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "cannot initialize logging file handler",
        ));

    assert_eq!(fx.log_len(), 0);
    fx.assert_file_content(&fx.path("app_copy1.log"), "abc");
}

#[test]
fn test_debug_level_prints_parameters_as_continuation_lines() {
    let fx = LogFixture::with_content("abc");

    let mut cmd = cargo_bin_cmd!("purge");
    cmd.arg("-t")
        .arg(&fx.log)
        .args(["-s", "0", "-l", "debug"])
        .assert()
        .success()
        .stderr(predicate::str::contains("logging parameters:"))
        .stderr(predicate::str::contains("| stderr: yes"))
        .stderr(predicate::str::contains("generated destination path"));
}

#[test]
fn test_numeric_level() {
    let fx = LogFixture::with_size(10);

    let mut cmd = cargo_bin_cmd!("purge");
    cmd.arg("-t")
        .arg(&fx.log)
        .args(["-s", "1", "-l", "20"])
        .assert()
        .success()
        .stderr(predicate::str::contains("INFO"))
        .stderr(predicate::str::contains("no actions required"));
}

#[test]
fn test_error_level_hides_warnings() {
    let fx = LogFixture::with_content("abc");

    let mut cmd = cargo_bin_cmd!("purge");
    cmd.arg("-t")
        .arg(&fx.log)
        .args(["-s", "0", "-n", "--force", "-l", "error"])
        .assert()
        .success()
        .stderr(predicate::str::is_empty());

    assert_eq!(fx.log_len(), 0);
}
