//! Process-table snapshots and termination.
//!
//! A [`ProcessDescriptor`] is a read-only snapshot derived from OS process
//! enumeration; it is never mutated and may describe a process that exits a
//! moment later. Callers must treat stale entries as "gone", not as errors.

use std::path::PathBuf;

use sysinfo::{Pid, ProcessesToUpdate, System};

#[derive(Debug, Clone)]
pub struct ProcessDescriptor {
    pub pid: u32,
    /// Executable name normalized for matching: lowercase, `.exe` stripped.
    pub executable_name: String,
    pub full_path: Option<PathBuf>,
    pub command_line: Vec<String>,
}

impl ProcessDescriptor {
    /// Name match against a canonical (already normalized) executable name.
    pub fn name_matches(&self, canonical: &str) -> bool {
        self.executable_name == canonical
    }

    /// True when any command-line argument contains the given substring.
    pub fn command_line_contains(&self, marker: &str) -> bool {
        self.command_line.iter().any(|arg| arg.contains(marker))
    }
}

/// Normalize an executable name for comparison across platforms.
pub fn normalize_executable_name(raw: &str) -> String {
    let lower = raw.to_ascii_lowercase();
    match lower.strip_suffix(".exe") {
        Some(stripped) => stripped.to_string(),
        None => lower,
    }
}

/// OS seam for enumeration and termination, so the lifecycle logic can be
/// exercised against a fake table.
pub trait ProcessTable: Send + Sync {
    /// Enumerate all visible processes. Best-effort: entries for processes
    /// the caller cannot inspect are simply absent.
    fn snapshot(&self) -> Vec<ProcessDescriptor>;

    /// Forcibly terminate a process. Returns false when the process is gone
    /// or cannot be signalled; killing an already-dead process is a no-op.
    fn kill(&self, pid: u32) -> bool;
}

/// Production implementation backed by sysinfo. A fresh `System` is built
/// per call: the table is authoritative state owned by the OS and snapshots
/// must not go stale across lifecycle transitions.
#[derive(Debug, Default)]
pub struct SysinfoProcessTable;

impl ProcessTable for SysinfoProcessTable {
    fn snapshot(&self) -> Vec<ProcessDescriptor> {
        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::All, true);
        system
            .processes()
            .iter()
            .map(|(pid, process)| ProcessDescriptor {
                pid: pid.as_u32(),
                executable_name: normalize_executable_name(&process.name().to_string_lossy()),
                full_path: process.exe().map(PathBuf::from),
                command_line: process
                    .cmd()
                    .iter()
                    .map(|arg| arg.to_string_lossy().into_owned())
                    .collect(),
            })
            .collect()
    }

    fn kill(&self, pid: u32) -> bool {
        let mut system = System::new();
        let target = Pid::from_u32(pid);
        system.refresh_processes(ProcessesToUpdate::Some(&[target]), true);
        match system.process(target) {
            Some(process) => process.kill(),
            // Already exited between enumerate and kill: tolerated.
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_exe_and_case() {
        assert_eq!(normalize_executable_name("MITMDUMP.EXE"), "mitmdump");
        assert_eq!(normalize_executable_name("mitmdump"), "mitmdump");
        assert_eq!(normalize_executable_name("Python.exe"), "python");
    }

    #[test]
    fn test_command_line_contains() {
        let d = ProcessDescriptor {
            pid: 1,
            executable_name: "python".into(),
            full_path: None,
            command_line: vec!["python".into(), "C:\\tools\\run_mitm.py".into()],
        };
        assert!(d.command_line_contains("run_mitm"));
        assert!(!d.command_line_contains("unrelated"));
    }

    #[test]
    fn test_snapshot_includes_current_process() {
        let table = SysinfoProcessTable;
        let me = std::process::id();
        let snapshot = table.snapshot();
        assert!(
            snapshot.iter().any(|d| d.pid == me),
            "snapshot did not include the test process itself"
        );
    }

    #[test]
    fn test_kill_missing_pid_is_noop_false() {
        let table = SysinfoProcessTable;
        // PIDs wrap well below u32::MAX on real systems.
        assert!(!table.kill(u32::MAX - 7));
    }
}
