mod common;

use std::fs;
use std::path::Path;
use std::process::Command;

fn startup_bin(app_dir: &Path, startup_dir: &Path) -> Command {
    let proxy = app_dir.join("mitmdump");
    fs::write(&proxy, b"").expect("touch proxy");
    let mut cmd = common::bin(app_dir);
    cmd.env("PROXIMITM_STARTUP_DIR", startup_dir)
        .env("PROXIMITM_PROXY_EXE", &proxy);
    cmd
}

#[test]
fn test_startup_enable_status_disable_cycle() {
    let td = tempfile::tempdir().expect("tmpdir");
    let startup_dir = td.path().join("startup");

    let out = startup_bin(td.path(), &startup_dir)
        .args(["startup", "status"])
        .output()
        .expect("run");
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "disabled");

    let out = startup_bin(td.path(), &startup_dir)
        .args(["startup", "enable"])
        .output()
        .expect("run");
    assert!(out.status.success(), "enable exited nonzero");
    let entries: Vec<_> = fs::read_dir(&startup_dir)
        .expect("startup dir missing after enable")
        .filter_map(|e| e.ok())
        .collect();
    assert_eq!(entries.len(), 1, "exactly one artifact expected");
    let content = fs::read_to_string(entries[0].path()).expect("read artifact");
    assert!(content.contains("block_global=false"));
    assert!(content.contains("45871"));

    let out = startup_bin(td.path(), &startup_dir)
        .args(["startup", "status"])
        .output()
        .expect("run");
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "enabled");

    let out = startup_bin(td.path(), &startup_dir)
        .args(["startup", "disable"])
        .output()
        .expect("run");
    assert!(out.status.success(), "disable exited nonzero");
    let out = startup_bin(td.path(), &startup_dir)
        .args(["startup", "status"])
        .output()
        .expect("run");
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "disabled");
}

#[test]
fn test_startup_enable_fails_when_proxy_missing() {
    let td = tempfile::tempdir().expect("tmpdir");
    let startup_dir = td.path().join("startup");
    let gone = td.path().join("gone").join("mitmdump");
    let out = common::bin(td.path())
        .env("PROXIMITM_STARTUP_DIR", &startup_dir)
        .env("PROXIMITM_PROXY_EXE", &gone)
        .args(["startup", "enable"])
        .output()
        .expect("run");
    assert!(!out.status.success(), "enable must fail without a proxy");
    assert_eq!(out.status.code(), Some(127), "missing executable maps to 127");
    assert!(!startup_dir.join("MitmModular.desktop").exists());
    assert!(!startup_dir.join("MitmModular.bat").exists());
}
