//! Error kinds for lifecycle operations and their exit-code mapping.
//!
//! Policy:
//! - "Already in the desired state" is success, never an error.
//! - Probe failures during enumeration (access denied on a foreign process,
//!   process gone mid-scan) are absorbed at the call site; they never reach
//!   this type.
//! - Installer outcomes are a coarse success boolean plus transcript
//!   ([`crate::installer::InstallReport`]), not a `LifecycleError`, because
//!   the caller's only recourse is a retry prompt.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    /// An expected binary or file is missing at a concrete resolved path.
    /// Bare-name PATH fallbacks are exempt from this check.
    #[error("{what} not found at: {}", .path.display())]
    NotFound { what: &'static str, path: PathBuf },

    /// The proxy was spawned (or the spawn attempt failed) and the process
    /// table never reported it Running within the retry budget.
    #[error("failed to start proxy: {reason}")]
    StartFailed {
        reason: String,
        #[source]
        source: Option<io::Error>,
    },

    /// Termination did not converge: matching processes still exist after
    /// the kill sweep and settle delay.
    #[error("failed to stop proxy; some processes may need to be terminated manually")]
    StopFailed,

    /// A spawned helper (package installer, extractor) exited non-zero.
    #[error("{tool} failed with exit status {status}")]
    ExternalTool { tool: String, status: i32 },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Map a lifecycle error to a process exit code:
/// - 127 for a missing executable (command not found convention)
/// - 1 for everything else
pub fn exit_code_for_lifecycle_error(e: &LifecycleError) -> u8 {
    match e {
        LifecycleError::NotFound { .. } => 127,
        LifecycleError::Io(ioe) if ioe.kind() == io::ErrorKind::NotFound => 127,
        _ => 1,
    }
}
