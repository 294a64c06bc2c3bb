//! proximitm: launcher and lifecycle supervisor for a mitmdump proxy.
//!
//! The crate owns one logical proxy instance per machine. The OS process
//! table is the source of truth for whether that instance is running; the
//! in-process child handle is a convenience, never the authority. The main
//! pieces:
//!
//! - [`locator::ProcessLocator`]: resolves the Python runtime and the
//!   mitmdump executable from an ordered list of embedded locations before
//!   falling back to PATH.
//! - [`runtime::RuntimeAvailability`]: yes/no probes for the runtime and
//!   installed packages.
//! - [`lifecycle::ProxyLifecycleManager`]: idempotent start/stop plus a
//!   three-tier status scan over the process table.
//! - [`startup::StartupRegistrar`]: the login-time autostart artifact.
//! - [`installer::DependencyInstaller`]: one-shot acquisition of a missing
//!   runtime or proxy package.
//! - [`bootstrap::AppContext`]: composition root, run once at startup.

pub mod bootstrap;
pub mod color;
pub mod errors;
pub mod installer;
pub mod lifecycle;
pub mod locator;
pub mod lock;
pub mod proctable;
pub mod runtime;
pub mod startup;
pub mod util;

pub use bootstrap::AppContext;
pub use color::{
    color_enabled_stderr, log_error_stderr, log_info_stderr, log_warn_stderr, paint, set_color_mode,
    ColorMode,
};
pub use errors::{exit_code_for_lifecycle_error, LifecycleError};
pub use installer::{DependencyInstaller, InstallReport};
pub use lifecycle::{
    build_launch_config, LaunchConfig, ProxyLifecycleManager, ProxyStatus, RetryPolicy,
    StatusReport,
};
pub use locator::{ProcessLocator, Resolved};
pub use lock::{acquire_lock_at, LifecycleLock};
pub use proctable::{ProcessDescriptor, ProcessTable, SysinfoProcessTable};
pub use runtime::RuntimeAvailability;
pub use startup::StartupRegistrar;

/// TCP port the proxy listens on. Fixed across the system; changing it is a
/// release, not a runtime setting.
pub const PROXY_LISTEN_PORT: u16 = 45871;

/// Canonical executable name of the proxy. A process matching this name is
/// treated as our proxy regardless of its command line.
pub const PROXY_PROCESS_NAME: &str = "mitmdump";

/// Generic interpreter executable the proxy may run embedded in.
pub const RUNTIME_PROCESS_NAME: &str = "python";

/// Entry-point addon script handed to mitmdump with `-s`. The script itself
/// is opaque configuration data; only its path and name matter here.
pub const PROXY_SCRIPT_FILE: &str = "run_mitm.py";

/// Command-line substrings that identify a generic interpreter process as
/// our proxy (tier-3 status match).
pub const CMDLINE_MARKERS: &[&str] = &["mitmdump", "run_mitm"];

/// Python package providing the proxy.
pub const PROXY_PACKAGE: &str = "mitmproxy";
