mod common;

#[test]
fn test_first_run_writes_marker_once() {
    let td = tempfile::tempdir().expect("tmpdir");
    let marker = td.path().join(".app_initialized");
    assert!(!marker.exists());

    let out = common::bin(td.path()).arg("status").output().expect("run");
    assert!(out.status.success());
    assert!(marker.is_file(), "first run must create the marker");
    let first_content = std::fs::read_to_string(&marker).expect("read marker");

    let out = common::bin(td.path()).arg("status").output().expect("run");
    assert!(out.status.success());
    let second_content = std::fs::read_to_string(&marker).expect("read marker");
    assert_eq!(first_content, second_content, "marker is written only once");
}
