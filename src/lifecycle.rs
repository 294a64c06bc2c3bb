//! Proxy lifecycle: status scan, idempotent start and stop.
//!
//! One logical proxy instance exists per machine, identified by executable
//! name and command-line content rather than by the in-process child handle;
//! the handle goes stale across application restarts while the process table
//! does not. Identification by name/substring is heuristic (racy, spoofable
//! names) and kept deliberately for parity with the supervised tool.
//!
//! status() is a lock-free snapshot. start() and stop() are read-check-act
//! sequences over a shared external resource and serialize on the lifecycle
//! file lock (see [`crate::lock`]).

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use serde::Serialize;

use crate::errors::LifecycleError;
use crate::locator::ProcessLocator;
use crate::lock::{self, LifecycleLock};
use crate::proctable::{ProcessDescriptor, ProcessTable, SysinfoProcessTable};
use crate::{CMDLINE_MARKERS, PROXY_LISTEN_PORT, PROXY_PROCESS_NAME, RUNTIME_PROCESS_NAME};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyStatus {
    Running,
    Stopped,
}

impl ProxyStatus {
    pub fn is_running(self) -> bool {
        matches!(self, ProxyStatus::Running)
    }
}

impl fmt::Display for ProxyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyStatus::Running => write!(f, "running"),
            ProxyStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// Immutable per-invocation spawn parameters. Constructed fresh on every
/// start; never cached.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub executable: PathBuf,
    pub script: PathBuf,
    pub listen_port: u16,
    pub working_dir: PathBuf,
    pub show_console: bool,
}

impl LaunchConfig {
    /// Fixed proxy arguments: addon script, LAN interception, listen port.
    pub fn args(&self) -> Vec<String> {
        vec![
            "-s".to_string(),
            self.script.display().to_string(),
            "--set".to_string(),
            "block_global=false".to_string(),
            "--listen-port".to_string(),
            self.listen_port.to_string(),
        ]
    }

    /// Quoted single-line invocation, used by the startup artifact and by
    /// diagnostics output.
    pub fn invocation_line(&self) -> String {
        format!(
            "\"{}\" -s \"{}\" --set block_global=false --listen-port {}",
            self.executable.display(),
            self.script.display(),
            self.listen_port
        )
    }
}

/// Resolve executable and script paths into a [`LaunchConfig`], failing fast
/// when the resolved proxy executable is a concrete path that does not exist
/// on disk. The bare-name fallback is exempt: PATH resolution happens at
/// spawn time.
pub fn build_launch_config(
    locator: &ProcessLocator,
    show_console: bool,
) -> Result<LaunchConfig, LifecycleError> {
    let proxy = locator.resolve_proxy_executable();
    if !proxy.path_fallback && !proxy.path.is_file() {
        return Err(LifecycleError::NotFound {
            what: PROXY_PROCESS_NAME,
            path: proxy.path,
        });
    }
    Ok(LaunchConfig {
        executable: proxy.path,
        script: locator.script_path(),
        listen_port: PROXY_LISTEN_PORT,
        working_dir: locator.working_dir(),
        show_console,
    })
}

/// Owned reference to a process this manager spawned itself. Not
/// authoritative; liveness questions go to the process table first.
pub trait ChildHandle: Send {
    fn pid(&self) -> u32;
    /// True when the process is known to have exited. A failed liveness
    /// probe counts as exited: the process is treated as gone.
    fn has_exited(&mut self) -> bool;
    /// Hard kill; killing an already-dead process is a non-fatal no-op.
    fn kill(&mut self);
}

impl ChildHandle for Child {
    fn pid(&self) -> u32 {
        self.id()
    }

    fn has_exited(&mut self) -> bool {
        matches!(self.try_wait(), Ok(Some(_)) | Err(_))
    }

    fn kill(&mut self) {
        let _ = Child::kill(self);
        // Reap so the pid cannot linger as a zombie on Unix.
        let _ = self.try_wait();
    }
}

/// Spawn seam for the lifecycle manager.
pub trait ProxyLauncher: Send + Sync {
    fn spawn(&self, config: &LaunchConfig) -> io::Result<Box<dyn ChildHandle>>;
}

/// Production launcher: plain `std::process::Command`. Console visibility
/// and output redirection are mutually exclusive; when hidden, stdout and
/// stderr are captured (held by the child handle) and on Windows no console
/// window is created.
#[derive(Debug, Default)]
pub struct CommandLauncher;

impl ProxyLauncher for CommandLauncher {
    fn spawn(&self, config: &LaunchConfig) -> io::Result<Box<dyn ChildHandle>> {
        let mut cmd = Command::new(&config.executable);
        cmd.args(config.args()).current_dir(&config.working_dir);
        if !config.show_console {
            cmd.stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
            #[cfg(windows)]
            {
                use std::os::windows::process::CommandExt;
                const CREATE_NO_WINDOW: u32 = 0x0800_0000;
                cmd.creation_flags(CREATE_NO_WINDOW);
            }
        }
        let child = cmd.spawn()?;
        Ok(Box::new(child))
    }
}

/// Fixed settle delays and bounded retry counts. No exponential backoff;
/// process start/exit latency is absorbed by flat waits.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Wait after spawn before the first status re-check.
    pub start_settle: Duration,
    /// Spacing between post-settle status polls.
    pub start_poll_interval: Duration,
    /// Number of post-settle status polls before giving up.
    pub start_polls: u32,
    /// Wait after the kill sweep before the final status re-check.
    pub stop_settle: Duration,
    /// How long a mutation waits for a concurrent mutation to finish.
    pub lock_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            start_settle: Duration::from_secs(5),
            start_poll_interval: Duration::from_secs(1),
            start_polls: 3,
            stop_settle: Duration::from_secs(1),
            lock_wait: Duration::from_secs(10),
        }
    }
}

/// Tier-1 match: the canonical proxy executable name alone is sufficient
/// evidence, regardless of command line.
fn is_proxy_process(d: &ProcessDescriptor) -> bool {
    d.name_matches(PROXY_PROCESS_NAME)
}

/// Tier-3 match: a generic interpreter process is ours only when its command
/// line carries one of the identifying markers. The name alone is ambiguous.
fn is_runtime_hosted_proxy(d: &ProcessDescriptor) -> bool {
    d.executable_name.starts_with(RUNTIME_PROCESS_NAME)
        && CMDLINE_MARKERS.iter().any(|m| d.command_line_contains(m))
}

/// Machine-readable status summary for `status --json`.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub status: String,
    pub listen_port: u16,
    pub proxy_executable: String,
    pub path_fallback: bool,
    pub startup_enabled: bool,
    pub matching_pids: Vec<u32>,
}

pub struct ProxyLifecycleManager {
    locator: ProcessLocator,
    table: Box<dyn ProcessTable>,
    launcher: Box<dyn ProxyLauncher>,
    retry: RetryPolicy,
    lock_path: Option<PathBuf>,
    handle: Mutex<Option<Box<dyn ChildHandle>>>,
}

impl ProxyLifecycleManager {
    pub fn new(locator: ProcessLocator) -> Self {
        Self::with_parts(
            locator,
            Box::new(SysinfoProcessTable),
            Box::new(CommandLauncher),
            RetryPolicy::default(),
        )
    }

    /// Assemble from explicit parts (tests inject fakes here).
    pub fn with_parts(
        locator: ProcessLocator,
        table: Box<dyn ProcessTable>,
        launcher: Box<dyn ProxyLauncher>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            locator,
            table,
            launcher,
            retry,
            lock_path: None,
            handle: Mutex::new(None),
        }
    }

    /// Pin the mutation lock to a specific path instead of the default
    /// per-machine candidates.
    pub fn with_lock_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock_path = Some(path.into());
        self
    }

    pub fn locator(&self) -> &ProcessLocator {
        &self.locator
    }

    fn handle_guard(&self) -> MutexGuard<'_, Option<Box<dyn ChildHandle>>> {
        match self.handle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn mutation_lock(&self) -> Result<Option<LifecycleLock>, LifecycleError> {
        if !lock::should_acquire_lock() {
            return Ok(None);
        }
        let lock = match &self.lock_path {
            Some(p) => lock::acquire_lock_at_with_timeout(p, self.retry.lock_wait)?,
            None => lock::acquire_lock(self.retry.lock_wait)?,
        };
        Ok(Some(lock))
    }

    /// Authoritative status scan, in priority order:
    /// 1. any process named like the proxy executable;
    /// 2. the in-process handle, when it has not exited;
    /// 3. any interpreter process whose command line marks it as ours.
    ///
    /// No liveness handshake against the proxy's port is performed; a
    /// matching process is assumed launched by this system and healthy.
    pub fn status(&self) -> ProxyStatus {
        let snapshot = self.table.snapshot();
        if snapshot.iter().any(is_proxy_process) {
            return ProxyStatus::Running;
        }
        {
            let mut guard = self.handle_guard();
            if let Some(handle) = guard.as_mut() {
                if !handle.has_exited() {
                    return ProxyStatus::Running;
                }
            }
        }
        if snapshot.iter().any(is_runtime_hosted_proxy) {
            ProxyStatus::Running
        } else {
            ProxyStatus::Stopped
        }
    }

    /// Every process the status tiers would attribute to the proxy.
    pub fn matching_processes(&self) -> Vec<ProcessDescriptor> {
        self.table
            .snapshot()
            .into_iter()
            .filter(|d| is_proxy_process(d) || is_runtime_hosted_proxy(d))
            .collect()
    }

    /// Start the proxy. Already running is success. Nothing persistent is
    /// mutated before the spawn attempt, so failure needs no cleanup.
    pub fn start(&self, show_console: bool) -> Result<(), LifecycleError> {
        let _lock = self.mutation_lock()?;
        if self.status().is_running() {
            return Ok(());
        }
        let config = build_launch_config(&self.locator, show_console)?;
        let child = match self.launcher.spawn(&config) {
            Ok(child) => child,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(LifecycleError::NotFound {
                    what: PROXY_PROCESS_NAME,
                    path: config.executable,
                })
            }
            Err(e) => {
                return Err(LifecycleError::StartFailed {
                    reason: format!("could not spawn {}", config.executable.display()),
                    source: Some(e),
                })
            }
        };
        *self.handle_guard() = Some(child);

        thread::sleep(self.retry.start_settle);
        for _ in 0..self.retry.start_polls {
            if self.status().is_running() {
                return Ok(());
            }
            thread::sleep(self.retry.start_poll_interval);
        }
        Err(LifecycleError::StartFailed {
            reason: format!(
                "proxy not observed running after {} status checks",
                self.retry.start_polls
            ),
            source: None,
        })
    }

    /// Stop the proxy. Already stopped is success. The kill sweep covers
    /// every tier-1/tier-3 match, including orphans from crashed prior
    /// sessions, then the owned handle; double-kill is tolerated.
    pub fn stop(&self) -> Result<(), LifecycleError> {
        let _lock = self.mutation_lock()?;
        if !self.status().is_running() {
            return Ok(());
        }
        for descriptor in self.matching_processes() {
            // A process gone between enumerate and kill is treated as gone.
            let _ = self.table.kill(descriptor.pid);
        }
        {
            let mut guard = self.handle_guard();
            if let Some(mut handle) = guard.take() {
                if !handle.has_exited() {
                    handle.kill();
                }
            }
        }
        thread::sleep(self.retry.stop_settle);
        if self.status().is_running() {
            Err(LifecycleError::StopFailed)
        } else {
            Ok(())
        }
    }

    pub fn status_report(&self, startup_enabled: bool) -> StatusReport {
        let resolved = self.locator.resolve_proxy_executable();
        StatusReport {
            status: self.status().to_string(),
            listen_port: PROXY_LISTEN_PORT,
            proxy_executable: resolved.path.display().to_string(),
            path_fallback: resolved.path_fallback,
            startup_enabled,
            matching_pids: self.matching_processes().iter().map(|d| d.pid).collect(),
        }
    }
}
