//! Process-wide initialization, run once by the composition root.
//!
//! `AppContext` replaces the ambient statics of a typical app shell: it owns
//! the locator, the lifecycle manager and the first-launch flag, and is
//! constructed exactly once at startup and passed down from there.

use std::fs;
use std::io;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::installer::DependencyInstaller;
use crate::lifecycle::{ProxyLifecycleManager, ProxyStatus};
use crate::locator::ProcessLocator;
use crate::runtime::RuntimeAvailability;

/// Sentinel file in the app folder; existence means "not first launch".
/// Content is a human-readable timestamp, written once and never parsed.
pub const FIRST_LAUNCH_MARKER: &str = ".app_initialized";

pub struct AppContext {
    locator: ProcessLocator,
    lifecycle: ProxyLifecycleManager,
    first_launch: bool,
}

impl AppContext {
    /// Production entry point: environment-derived app folder.
    pub fn initialize() -> io::Result<Self> {
        Self::initialize_with(ProcessLocator::from_env())
    }

    /// Initialize against an explicit locator. Detects first launch via the
    /// marker file and creates the marker when absent; marker-write failures
    /// are not fatal (the launch simply counts as first again next time).
    pub fn initialize_with(locator: ProcessLocator) -> io::Result<Self> {
        let marker = locator.app_dir().join(FIRST_LAUNCH_MARKER);
        let first_launch = !marker.exists();
        if first_launch {
            let stamp = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            let _ = fs::write(&marker, format!("initialized at unix time {stamp}\n"));
        }
        let lifecycle = ProxyLifecycleManager::new(locator.clone());
        Ok(Self {
            locator,
            lifecycle,
            first_launch,
        })
    }

    pub fn is_first_launch(&self) -> bool {
        self.first_launch
    }

    pub fn locator(&self) -> &ProcessLocator {
        &self.locator
    }

    pub fn lifecycle(&self) -> &ProxyLifecycleManager {
        &self.lifecycle
    }

    pub fn availability(&self) -> RuntimeAvailability {
        RuntimeAvailability::new(self.locator.clone())
    }

    pub fn installer(&self) -> DependencyInstaller {
        DependencyInstaller::new(self.locator.clone())
    }

    /// Read-only status probe at application start. Nothing is started or
    /// stopped here; the result only seeds what the caller renders.
    pub fn reconcile_on_startup(&self) -> ProxyStatus {
        self.lifecycle.status()
    }

    /// Dependencies are always verified on first launch; afterwards only
    /// when something went missing since the last run (uninstalled runtime).
    pub fn should_check_dependencies(&self) -> bool {
        if self.first_launch {
            return true;
        }
        let availability = self.availability();
        !(availability.is_runtime_available() && availability.is_proxy_available())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_launch_creates_marker_once() {
        let td = tempfile::tempdir().expect("tmpdir");
        let locator = ProcessLocator::new(td.path());

        let first = AppContext::initialize_with(locator.clone()).expect("init");
        assert!(first.is_first_launch());
        let marker = td.path().join(FIRST_LAUNCH_MARKER);
        assert!(marker.is_file(), "marker must be created on first launch");

        let second = AppContext::initialize_with(locator).expect("init again");
        assert!(!second.is_first_launch());
    }

    #[test]
    fn test_marker_content_is_never_interpreted() {
        let td = tempfile::tempdir().expect("tmpdir");
        let marker = td.path().join(FIRST_LAUNCH_MARKER);
        fs::write(&marker, "garbage that nothing parses").expect("write marker");
        let ctx = AppContext::initialize_with(ProcessLocator::new(td.path())).expect("init");
        assert!(!ctx.is_first_launch(), "existence alone decides");
    }

    #[test]
    fn test_should_check_dependencies_on_first_launch() {
        let td = tempfile::tempdir().expect("tmpdir");
        let ctx = AppContext::initialize_with(ProcessLocator::new(td.path())).expect("init");
        assert!(ctx.should_check_dependencies());
    }
}
