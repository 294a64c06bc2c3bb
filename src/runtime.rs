//! Availability probes for the scripting runtime and the proxy package.
//!
//! Two checks, chosen by how the executable resolved:
//! - embedded (concrete path): exists-on-disk is the answer, since a
//!   `--version` run proves nothing extra about a bundle we ship;
//! - PATH fallback (bare name): the binary must actually be executed and
//!   its exit code checked, because "exists" is meaningless for a name.
//!
//! Failure to start a probe (missing binary, permission denied, timeout) is
//! indistinguishable from "not available" by design; callers never see a
//! probe error.

use std::time::Duration;

use crate::locator::{ProcessLocator, Resolved};
use crate::util::exec::{ExecRequest, ExecService};
use crate::PROXY_PACKAGE;

const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct RuntimeAvailability {
    locator: ProcessLocator,
    exec: ExecService,
}

impl RuntimeAvailability {
    pub fn new(locator: ProcessLocator) -> Self {
        Self {
            locator,
            exec: ExecService::new(PROBE_TIMEOUT),
        }
    }

    /// Is a Python interpreter usable, embedded or on PATH?
    pub fn is_runtime_available(&self) -> bool {
        let resolved = self.locator.resolve_runtime_executable();
        if !resolved.path_fallback {
            return resolved.exists_on_disk();
        }
        self.probe_succeeds(&resolved, &["--version"])
    }

    /// Can the runtime import the named package?
    pub fn is_package_available(&self, name: &str) -> bool {
        let resolved = self.locator.resolve_runtime_executable();
        let import = format!("import {name}");
        self.probe_succeeds(&resolved, &["-c", &import])
    }

    /// Is the proxy usable? True when the runtime can import the proxy
    /// package, or when a proxy executable resolves (embedded: on disk;
    /// PATH: answers `--version`).
    pub fn is_proxy_available(&self) -> bool {
        if self.is_package_available(PROXY_PACKAGE) {
            return true;
        }
        let resolved = self.locator.resolve_proxy_executable();
        if !resolved.path_fallback {
            return resolved.exists_on_disk();
        }
        self.probe_succeeds(&resolved, &["--version"])
    }

    fn probe_succeeds(&self, resolved: &Resolved, args: &[&str]) -> bool {
        self.exec
            .run(ExecRequest::new(resolved.path.as_os_str()).args(args.iter().copied()))
            .map(|out| out.success())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_runtime_missing_is_unavailable() {
        let td = tempfile::tempdir().expect("tmpdir");
        let gone = td.path().join("runtime").join("python");
        let availability =
            RuntimeAvailability::new(ProcessLocator::new(td.path()).with_runtime_override(&gone));
        assert!(!availability.is_runtime_available());
    }

    #[test]
    fn test_embedded_runtime_present_is_available_without_execution() {
        let td = tempfile::tempdir().expect("tmpdir");
        // A plain file is enough: embedded installs are not version-probed.
        let exe = td.path().join("python");
        std::fs::write(&exe, b"").expect("touch");
        let availability =
            RuntimeAvailability::new(ProcessLocator::new(td.path()).with_runtime_override(&exe));
        assert!(availability.is_runtime_available());
    }

    #[test]
    fn test_package_probe_with_broken_runtime_is_unavailable_not_error() {
        let td = tempfile::tempdir().expect("tmpdir");
        let gone = td.path().join("nowhere").join("python");
        let availability =
            RuntimeAvailability::new(ProcessLocator::new(td.path()).with_runtime_override(&gone));
        assert!(!availability.is_package_available("mitmproxy"));
    }
}
