mod common;

// Install tests run fully offline: the runtime override points at a missing
// path, so the proxy-package path fails before any download is attempted.

#[test]
fn test_install_proxy_without_runtime_fails_with_transcript() {
    let td = tempfile::tempdir().expect("tmpdir");
    let gone = td.path().join("nowhere");
    let out = common::bin(td.path())
        .env("PROXIMITM_RUNTIME_EXE", gone.join("python"))
        .env("PROXIMITM_PROXY_EXE", gone.join("mitmdump"))
        .args(["install", "proxy"])
        .output()
        .expect("run");
    assert!(!out.status.success(), "install must fail without a runtime");
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(
        stderr.contains("runtime is not available"),
        "transcript must name the missing runtime: {stderr}"
    );
    assert!(stderr.contains("installation failed"), "missing summary: {stderr}");
}

#[test]
fn test_install_runtime_already_present_is_a_no_op() {
    let td = tempfile::tempdir().expect("tmpdir");
    let python = td.path().join("python");
    std::fs::write(&python, b"").expect("touch python");
    let out = common::bin(td.path())
        .env("PROXIMITM_RUNTIME_EXE", &python)
        .args(["--verbose", "install", "runtime"])
        .output()
        .expect("run");
    assert!(out.status.success(), "install runtime must succeed");
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(
        stderr.contains("runtime already installed"),
        "expected idempotent no-op: {stderr}"
    );
}
