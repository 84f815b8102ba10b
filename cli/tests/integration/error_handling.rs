//! Error handling integration tests for the purge CLI.
//!
//! These tests verify exit codes and that the target survives every failure:
//! - Target validation (missing, directory, symlink, special file)
//! - Copy failures abort before truncation
//! - Truncation failures after a successful copy
//! - Argument errors from the parser

#[path = "../common/mod.rs"]
mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use common::LogFixture;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

// =============================================================================
// Target validation
// =============================================================================

#[test]
fn test_missing_target_exits_1() {
    let dir = TempDir::new().unwrap();

    let mut cmd = cargo_bin_cmd!("purge");
    cmd.arg("-t")
        .arg(dir.path().join("missing.log"))
        .args(["-s", "1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("target_not_found"))
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_directory_target_exits_2() {
    let dir = TempDir::new().unwrap();

    let mut cmd = cargo_bin_cmd!("purge");
    cmd.arg("-t")
        .arg(dir.path())
        .args(["-s", "0"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("is a directory"));
}

#[cfg(unix)]
#[test]
fn test_symlink_target_exits_3() {
    let fx = LogFixture::with_content("real");
    let link = fx.path("link.log");
    std::os::unix::fs::symlink(&fx.log, &link).unwrap();

    let mut cmd = cargo_bin_cmd!("purge");
    cmd.arg("-t")
        .arg(&link)
        .args(["-s", "0"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("symbolic link"));

    fx.assert_file_content(&fx.log, "real");
    assert!(!fx.path("link_copy1.log").exists());
}

#[cfg(unix)]
#[test]
fn test_fifo_target_exits_3() {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let dir = TempDir::new().unwrap();
    let fifo = dir.path().join("pipe.log");
    let c_path = CString::new(fifo.as_os_str().as_bytes()).unwrap();
    // SAFETY: c_path is a valid NUL-terminated path
    assert_eq!(unsafe { libc::mkfifo(c_path.as_ptr(), 0o644) }, 0);

    let mut cmd = cargo_bin_cmd!("purge");
    cmd.arg("-t")
        .arg(&fifo)
        .args(["-s", "0"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("not a regular file"));
}

// =============================================================================
// Copy and truncate failures
// =============================================================================

#[test]
fn test_copy_failure_keeps_target_and_exits_4() {
    let fx = LogFixture::with_content("keep me");

    let mut cmd = cargo_bin_cmd!("purge");
    cmd.arg("-t")
        .arg(&fx.log)
        .args(["-s", "0", "-c"])
        .arg(fx.path("no/such/dir/backup.log"))
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Failed to rotate"));

    fx.assert_file_content(&fx.log, "keep me");
    fx.assert_no_staging();
}

#[test]
fn test_copy_onto_itself_exits_4() {
    let fx = LogFixture::with_content("keep me");

    let mut cmd = cargo_bin_cmd!("purge");
    cmd.arg("-t")
        .arg(&fx.log)
        .args(["-s", "0", "-c"])
        .arg(&fx.log)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("target itself"));

    fx.assert_file_content(&fx.log, "keep me");
}

#[test]
fn test_copy_onto_directory_keeps_directory() {
    let fx = LogFixture::with_content("keep me");
    let backup_dir = fx.path("backup");
    fs::create_dir(&backup_dir).unwrap();
    fs::write(backup_dir.join("inside.txt"), "inside content").unwrap();

    let mut cmd = cargo_bin_cmd!("purge");
    cmd.arg("-t")
        .arg(&fx.log)
        .args(["-s", "0", "-c"])
        .arg(&backup_dir)
        .assert()
        .code(4);

    assert!(backup_dir.is_dir(), "Directory should still exist");
    fx.assert_file_content(&backup_dir.join("inside.txt"), "inside content");
    fx.assert_file_content(&fx.log, "keep me");
    fx.assert_no_staging();
}

#[cfg(unix)]
#[test]
fn test_readonly_target_exits_5_after_backup() {
    use std::os::unix::fs::PermissionsExt;

    if common::running_as_root() {
        return;
    }

    let fx = LogFixture::with_content("read only");
    fs::set_permissions(&fx.log, fs::Permissions::from_mode(0o444)).unwrap();

    let mut cmd = cargo_bin_cmd!("purge");
    cmd.arg("-t")
        .arg(&fx.log)
        .args(["-s", "0"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("truncate_failed"));

    fx.assert_file_content(&fx.log, "read only");
    fx.assert_file_content(&fx.path("app_copy1.log"), "read only");
}

#[cfg(unix)]
#[test]
fn test_unwritable_directory_exits_4() {
    use std::os::unix::fs::PermissionsExt;

    if common::running_as_root() {
        return;
    }

    let fx = LogFixture::with_content("content");
    let locked = fx.path("locked");
    fs::create_dir(&locked).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

    let mut cmd = cargo_bin_cmd!("purge");
    cmd.arg("-t")
        .arg(&fx.log)
        .args(["-s", "0", "-c"])
        .arg(locked.join("backup.log"))
        .assert()
        .code(4)
        .stderr(predicate::str::contains("permission_denied"));

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    fx.assert_file_content(&fx.log, "content");
    assert_eq!(fs::read_dir(&locked).unwrap().count(), 0);
}

// =============================================================================
// Argument errors
// =============================================================================

#[test]
fn test_copy_conflicts_with_nocopy() {
    let fx = LogFixture::with_content("content");

    let mut cmd = cargo_bin_cmd!("purge");
    cmd.arg("-t")
        .arg(&fx.log)
        .args(["-s", "0", "-n", "-c", "backup.log"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot be used with"));

    fx.assert_file_content(&fx.log, "content");
}

#[test]
fn test_force_conflicts_with_safe() {
    let fx = LogFixture::with_content("content");

    let mut cmd = cargo_bin_cmd!("purge");
    cmd.arg("-t")
        .arg(&fx.log)
        .args(["-s", "0", "--force", "--safe"])
        .assert()
        .code(2);

    fx.assert_file_content(&fx.log, "content");
}

#[test]
fn test_negative_size_rejected() {
    let fx = LogFixture::with_content("content");

    let mut cmd = cargo_bin_cmd!("purge");
    cmd.arg("-t")
        .arg(&fx.log)
        .arg("--size=-5")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("size cannot be negative"));
}

#[test]
fn test_unknown_unit_rejected() {
    let fx = LogFixture::with_content("content");

    let mut cmd = cargo_bin_cmd!("purge");
    cmd.arg("-t")
        .arg(&fx.log)
        .args(["-s", "1", "-u", "TB"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not a size unit"));
}

#[test]
fn test_missing_required_arguments() {
    cargo_bin_cmd!("purge")
        .args(["-s", "1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--target"));

    cargo_bin_cmd!("purge")
        .args(["-t", "app.log"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--size"));
}

#[test]
fn test_nostderr_silences_errors() {
    let dir = TempDir::new().unwrap();

    let mut cmd = cargo_bin_cmd!("purge");
    cmd.arg("-t")
        .arg(dir.path().join("missing.log"))
        .args(["-s", "1", "--nostderr"])
        .assert()
        .code(1)
        .stderr(predicate::str::is_empty());
}
