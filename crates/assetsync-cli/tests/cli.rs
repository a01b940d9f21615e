//! End-to-end checks of the `assetsync` binary.

use std::process::Command;

fn assetsync() -> Command {
    Command::new(env!("CARGO_BIN_EXE_assetsync"))
}

#[test]
fn test_help_command() {
    let output = assetsync().arg("--help").output().expect("failed to run assetsync");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
}

#[test]
fn test_normalize_hash() {
    let output = assetsync()
        .args(["normalize-hash", "72623859790382856"])
        .output()
        .expect("failed to run assetsync");
    assert!(output.status.success());
    // 72623859790382856 == 0x0102030405060708
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "0102030405060708");
}

#[test]
fn test_patch_name_lowercases() {
    let output = assetsync()
        .args(["patch-name", "CAFEBABE"])
        .output()
        .expect("failed to run assetsync");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "cafebabe.patch");
}

#[test]
fn test_sync_without_base_url_fails() {
    let home = tempfile::tempdir().expect("failed to create temp dir");
    let output = assetsync()
        .arg("sync")
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .env_remove("ASSETSYNC_BASE_URL")
        .env_remove("ASSETSYNC_CONFIG")
        .output()
        .expect("failed to run assetsync");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("base_url"));
}
