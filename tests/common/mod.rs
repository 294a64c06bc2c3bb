use std::path::Path;
use std::process::Command;

/// Command for the built binary with a pinned app folder and colors off.
/// Env lives on the child process only; the test process stays untouched.
pub fn bin(app_dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_proximitm"));
    cmd.env("PROXIMITM_APP_DIR", app_dir).env("NO_COLOR", "1");
    cmd
}
