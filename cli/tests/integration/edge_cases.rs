//! Edge case integration tests for the purge CLI.
//!
//! These tests cover boundary conditions and metadata handling:
//! - Empty files and exact thresholds
//! - Backup naming for unusual file names
//! - Relative target paths
//! - Timestamp and permission preservation

#[path = "../common/mod.rs"]
mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use common::LogFixture;
use filetime::FileTime;
use std::fs;
use tempfile::TempDir;

// =============================================================================
// Boundaries
// =============================================================================

/// Test rotating an empty file with a zero threshold.
#[test]
fn test_empty_file_zero_threshold() {
    let fx = LogFixture::with_content("");

    cargo_bin_cmd!("purge")
        .arg("-t")
        .arg(&fx.log)
        .args(["-s", "0"])
        .assert()
        .success();

    let backup = fx.path("app_copy1.log");
    assert!(backup.exists());
    assert_eq!(fs::metadata(&backup).unwrap().len(), 0);
}

/// Test that a size exactly at the threshold rotates.
#[test]
fn test_exact_threshold_rotates() {
    let fx = LogFixture::with_size(8192);

    cargo_bin_cmd!("purge")
        .arg("-t")
        .arg(&fx.log)
        .args(["-s", "8", "-u", "KB"])
        .assert()
        .success();

    assert_eq!(fx.log_len(), 0);
    assert_eq!(fs::metadata(fx.path("app_copy1.log")).unwrap().len(), 8192);
}

/// Test that one byte under the threshold does not rotate.
#[test]
fn test_one_byte_under_threshold() {
    let fx = LogFixture::with_size(8191);

    cargo_bin_cmd!("purge")
        .arg("-t")
        .arg(&fx.log)
        .args(["-s", "8192", "-u", "B"])
        .assert()
        .success();

    assert_eq!(fx.log_len(), 8191);
}

/// Test a huge threshold that would overflow when converted to bytes.
#[test]
fn test_overflowing_threshold_never_rotates() {
    let fx = LogFixture::with_size(10);

    cargo_bin_cmd!("purge")
        .arg("-t")
        .arg(&fx.log)
        .args(["-s", &u64::MAX.to_string(), "-u", "GB"])
        .assert()
        .success();

    assert_eq!(fx.log_len(), 10);
}

// =============================================================================
// Backup naming
// =============================================================================

#[test]
fn test_backup_name_without_extension() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("syslog");
    fs::write(&target, "lines").unwrap();

    cargo_bin_cmd!("purge")
        .arg("-t")
        .arg(&target)
        .args(["-s", "0"])
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(dir.path().join("syslog_copy1")).unwrap(),
        "lines"
    );
}

#[test]
fn test_backup_name_for_dotfile() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join(".history");
    fs::write(&target, "lines").unwrap();

    cargo_bin_cmd!("purge")
        .arg("-t")
        .arg(&target)
        .args(["-s", "0"])
        .assert()
        .success();

    assert!(dir.path().join(".history_copy1").exists());
}

#[test]
fn test_backup_name_with_unicode() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("журнал.log");
    fs::write(&target, "записи").unwrap();

    cargo_bin_cmd!("purge")
        .arg("-t")
        .arg(&target)
        .args(["-s", "0"])
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(dir.path().join("журнал_copy1.log")).unwrap(),
        "записи"
    );
}

#[test]
fn test_backup_name_skips_dangling_symlink() {
    let fx = LogFixture::with_content("lines");
    #[cfg(unix)]
    std::os::unix::fs::symlink(fx.path("gone"), fx.path("app_copy1.log")).unwrap();
    #[cfg(not(unix))]
    fs::write(fx.path("app_copy1.log"), "").unwrap();

    cargo_bin_cmd!("purge")
        .arg("-t")
        .arg(&fx.log)
        .args(["-s", "0"])
        .assert()
        .success();

    fx.assert_file_content(&fx.path("app_copy2.log"), "lines");
}

#[test]
fn test_relative_target_backs_up_next_to_it() {
    let fx = LogFixture::with_content("relative");
    fs::create_dir(fx.path("logs")).unwrap();
    fs::write(fx.path("logs/app.log"), "nested").unwrap();

    cargo_bin_cmd!("purge")
        .current_dir(fx.dir.path())
        .args(["-t", "logs/app.log", "-s", "0"])
        .assert()
        .success();

    fx.assert_file_content(&fx.path("logs/app_copy1.log"), "nested");
    assert!(!fx.path("app_copy1.log").exists());
}

// =============================================================================
// Metadata preservation
// =============================================================================

#[test]
fn test_backup_keeps_mtime() {
    let fx = LogFixture::with_content("old lines");
    let old = FileTime::from_unix_time(1_600_000_000, 0);
    filetime::set_file_mtime(&fx.log, old).unwrap();

    cargo_bin_cmd!("purge")
        .arg("-t")
        .arg(&fx.log)
        .args(["-s", "0"])
        .assert()
        .success();

    let meta = fs::metadata(fx.path("app_copy1.log")).unwrap();
    assert_eq!(FileTime::from_last_modification_time(&meta), old);
}

#[test]
fn test_no_times_flag() {
    let fx = LogFixture::with_content("old lines");
    let old = FileTime::from_unix_time(1_600_000_000, 0);
    filetime::set_file_mtime(&fx.log, old).unwrap();

    cargo_bin_cmd!("purge")
        .arg("-t")
        .arg(&fx.log)
        .args(["-s", "0", "--no-times"])
        .assert()
        .success();

    let meta = fs::metadata(fx.path("app_copy1.log")).unwrap();
    assert!(FileTime::from_last_modification_time(&meta) > old);
}

#[cfg(unix)]
#[test]
fn test_backup_keeps_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let fx = LogFixture::with_content("lines");
    fs::set_permissions(&fx.log, fs::Permissions::from_mode(0o640)).unwrap();

    cargo_bin_cmd!("purge")
        .arg("-t")
        .arg(&fx.log)
        .args(["-s", "0"])
        .assert()
        .success();

    let mode = fs::metadata(fx.path("app_copy1.log"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o640);
    // Truncation keeps the target's own mode
    let mode = fs::metadata(&fx.log).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o640);
}

#[cfg(unix)]
#[test]
fn test_no_perms_flag() {
    use std::os::unix::fs::PermissionsExt;

    let fx = LogFixture::with_content("lines");
    fs::set_permissions(&fx.log, fs::Permissions::from_mode(0o604)).unwrap();

    cargo_bin_cmd!("purge")
        .arg("-t")
        .arg(&fx.log)
        .args(["-s", "0", "--no-perms"])
        .assert()
        .success();

    let mode = fs::metadata(fx.path("app_copy1.log"))
        .unwrap()
        .permissions()
        .mode();
    // Staging files are created owner-only
    assert_eq!(mode & 0o777, 0o600);
}
