mod common;

use std::fs;

#[test]
fn test_status_prints_single_state_word() {
    let td = tempfile::tempdir().expect("tmpdir");
    let out = common::bin(td.path())
        .arg("status")
        .output()
        .expect("failed to run binary");
    assert!(out.status.success(), "status exited nonzero");
    let stdout = String::from_utf8_lossy(&out.stdout);
    let word = stdout.trim();
    assert!(
        word == "running" || word == "stopped",
        "unexpected status output: {stdout}"
    );
}

#[test]
fn test_status_json_reports_port_and_resolved_proxy() {
    let td = tempfile::tempdir().expect("tmpdir");
    let proxy = td.path().join("mitmdump");
    fs::write(&proxy, b"").expect("touch proxy");
    let out = common::bin(td.path())
        .env("PROXIMITM_PROXY_EXE", &proxy)
        .args(["status", "--json"])
        .output()
        .expect("failed to run binary");
    assert!(out.status.success(), "status --json exited nonzero");
    let v: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("stdout is not valid JSON");
    assert_eq!(v["listen_port"], 45871);
    assert_eq!(v["path_fallback"], false);
    assert_eq!(v["proxy_executable"], proxy.display().to_string());
    assert!(v["status"] == "running" || v["status"] == "stopped");
    assert!(v["matching_pids"].is_array());
}
