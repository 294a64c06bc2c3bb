//! Filesystem resolution of the runtime and proxy executables.
//!
//! Resolution tries an ordered list of embedded locations under the
//! application's `tools/` folder and falls back to the bare command name,
//! leaving resolution to PATH at spawn time. The first candidate that exists
//! on disk wins. No caching: paths are cheap filesystem stats and the
//! embedded runtime can appear or vanish between calls (installer runs,
//! manual deletion), so every call re-resolves.

use std::env;
use std::path::{Path, PathBuf};

use crate::{PROXY_PROCESS_NAME, PROXY_SCRIPT_FILE, RUNTIME_PROCESS_NAME};

/// Outcome of a resolution attempt. `path_fallback` marks the bare command
/// name whose existence cannot be checked on disk.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub path: PathBuf,
    pub path_fallback: bool,
}

impl Resolved {
    pub fn exists_on_disk(&self) -> bool {
        !self.path_fallback && self.path.is_file()
    }
}

/// Append the platform executable suffix to a bare program name.
fn exe_name(base: &str) -> String {
    if cfg!(windows) {
        format!("{base}.exe")
    } else {
        base.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct ProcessLocator {
    app_dir: PathBuf,
    runtime_override: Option<PathBuf>,
    proxy_override: Option<PathBuf>,
}

impl ProcessLocator {
    pub fn new(app_dir: impl Into<PathBuf>) -> Self {
        Self {
            app_dir: app_dir.into(),
            runtime_override: None,
            proxy_override: None,
        }
    }

    /// Production constructor: PROXIMITM_APP_DIR wins, then the directory of
    /// the current executable, then the working directory. Explicit
    /// executable overrides (PROXIMITM_RUNTIME_EXE / PROXIMITM_PROXY_EXE)
    /// are captured here once; they are trusted as concrete paths and still
    /// subject to the exists-on-disk check before spawn.
    pub fn from_env() -> Self {
        let app_dir = env::var_os("PROXIMITM_APP_DIR")
            .map(PathBuf::from)
            .or_else(|| {
                env::current_exe()
                    .ok()
                    .and_then(|p| p.parent().map(Path::to_path_buf))
            })
            .or_else(|| env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        let mut locator = Self::new(app_dir);
        if let Some(p) = env::var_os("PROXIMITM_RUNTIME_EXE") {
            locator.runtime_override = Some(PathBuf::from(p));
        }
        if let Some(p) = env::var_os("PROXIMITM_PROXY_EXE") {
            locator.proxy_override = Some(PathBuf::from(p));
        }
        locator
    }

    pub fn with_runtime_override(mut self, path: impl Into<PathBuf>) -> Self {
        self.runtime_override = Some(path.into());
        self
    }

    pub fn with_proxy_override(mut self, path: impl Into<PathBuf>) -> Self {
        self.proxy_override = Some(path.into());
        self
    }

    pub fn app_dir(&self) -> &Path {
        &self.app_dir
    }

    pub fn tools_dir(&self) -> PathBuf {
        self.app_dir.join("tools")
    }

    /// Embedded runtime installation root.
    pub fn runtime_dir(&self) -> PathBuf {
        self.tools_dir().join("runtime")
    }

    /// Path of the proxy entry-point script handed to mitmdump with `-s`.
    pub fn script_path(&self) -> PathBuf {
        self.tools_dir().join(PROXY_SCRIPT_FILE)
    }

    /// Working directory for the spawned proxy: parent of the tools folder.
    pub fn working_dir(&self) -> PathBuf {
        self.app_dir.clone()
    }

    /// Resolve the Python interpreter: embedded locations first, then PATH.
    pub fn resolve_runtime_executable(&self) -> Resolved {
        if let Some(p) = &self.runtime_override {
            return Resolved {
                path: p.clone(),
                path_fallback: false,
            };
        }
        let exe = exe_name(RUNTIME_PROCESS_NAME);
        let runtime = self.runtime_dir();
        let candidates = vec![
            runtime.join(&exe),
            runtime.join("Scripts").join(&exe),
            Self::cwd_relative(&["tools", "runtime"], &exe),
            // Relocated layout: runtime folder moved up next to the app.
            self.app_dir.join("runtime").join(&exe),
        ];
        self.first_existing(candidates, RUNTIME_PROCESS_NAME)
    }

    /// Resolve the mitmdump executable: embedded locations first, then PATH.
    pub fn resolve_proxy_executable(&self) -> Resolved {
        if let Some(p) = &self.proxy_override {
            return Resolved {
                path: p.clone(),
                path_fallback: false,
            };
        }
        let exe = exe_name(PROXY_PROCESS_NAME);
        let runtime = self.runtime_dir();
        let candidates = vec![
            runtime.join("Scripts").join(&exe),
            runtime.join(&exe),
            self.app_dir.join("runtime").join("Scripts").join(&exe),
        ];
        self.first_existing(candidates, PROXY_PROCESS_NAME)
    }

    fn cwd_relative(parts: &[&str], exe: &str) -> PathBuf {
        let mut p = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        for part in parts {
            p.push(part);
        }
        p.push(exe);
        p
    }

    /// First candidate that exists on disk wins; otherwise the bare command
    /// name relying on PATH. Never fails.
    fn first_existing(&self, candidates: Vec<PathBuf>, fallback: &str) -> Resolved {
        for path in candidates {
            if path.is_file() {
                return Resolved {
                    path,
                    path_fallback: false,
                };
            }
        }
        Resolved {
            path: PathBuf::from(fallback),
            path_fallback: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(p: &Path) {
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, b"").unwrap();
    }

    #[test]
    fn test_resolve_falls_back_to_bare_name_when_nothing_embedded() {
        let td = tempfile::tempdir().expect("tmpdir");
        let locator = ProcessLocator::new(td.path());
        let r = locator.resolve_proxy_executable();
        assert!(r.path_fallback);
        assert_eq!(r.path, PathBuf::from(PROXY_PROCESS_NAME));
        assert!(!r.exists_on_disk());
    }

    #[test]
    fn test_resolve_prefers_embedded_scripts_dir_for_proxy() {
        let td = tempfile::tempdir().expect("tmpdir");
        let locator = ProcessLocator::new(td.path());
        let exe = exe_name(PROXY_PROCESS_NAME);
        let scripts = locator.runtime_dir().join("Scripts").join(&exe);
        let flat = locator.runtime_dir().join(&exe);
        touch(&scripts);
        touch(&flat);
        let r = locator.resolve_proxy_executable();
        assert!(!r.path_fallback);
        assert_eq!(r.path, scripts, "Scripts dir must win over the flat layout");
        assert!(r.exists_on_disk());
    }

    #[test]
    fn test_resolve_runtime_flat_layout() {
        let td = tempfile::tempdir().expect("tmpdir");
        let locator = ProcessLocator::new(td.path());
        let exe = locator.runtime_dir().join(exe_name(RUNTIME_PROCESS_NAME));
        touch(&exe);
        let r = locator.resolve_runtime_executable();
        assert_eq!(r.path, exe);
        assert!(!r.path_fallback);
    }

    #[test]
    fn test_override_is_concrete_even_when_missing() {
        let td = tempfile::tempdir().expect("tmpdir");
        let bogus = td.path().join("nowhere").join("mitmdump");
        let locator = ProcessLocator::new(td.path()).with_proxy_override(&bogus);
        let r = locator.resolve_proxy_executable();
        assert!(!r.path_fallback);
        assert_eq!(r.path, bogus);
        assert!(!r.exists_on_disk());
    }

    #[test]
    fn test_script_and_working_dir_layout() {
        let locator = ProcessLocator::new("/opt/proximitm");
        assert_eq!(
            locator.script_path(),
            PathBuf::from("/opt/proximitm/tools").join(PROXY_SCRIPT_FILE)
        );
        assert_eq!(locator.working_dir(), PathBuf::from("/opt/proximitm"));
    }
}
