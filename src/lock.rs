//! Mutual exclusion for lifecycle mutations.
//!
//! The OS process named `mitmdump` is a shared external resource: two
//! interleaved start() calls can double-spawn, and a stop() racing a start()
//! can report spurious failure. All mutations therefore serialize on an
//! exclusive file lock keyed on the logical proxy identity (the fixed listen
//! port). status() stays lock-free; it is an idempotent snapshot.

use fs2::FileExt;
use std::env;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::PROXY_LISTEN_PORT;

/// Lock guard that unlocks and removes the lock file on drop.
#[derive(Debug)]
pub struct LifecycleLock {
    file: File,
    path: PathBuf,
}

impl Drop for LifecycleLock {
    fn drop(&mut self) {
        // Best-effort unlock and removal; ignore errors
        let _ = self.file.unlock();
        let _ = fs::remove_file(&self.path);
    }
}

/// Honor PROXIMITM_SKIP_LOCK=1 to skip serialization, for callers that
/// already linearize lifecycle operations themselves.
pub fn should_acquire_lock() -> bool {
    env::var("PROXIMITM_SKIP_LOCK").ok().as_deref() != Some("1")
}

/// Candidate lock file locations, in order: XDG runtime dir when set, then
/// the system temp dir. The file name carries the listen port so that two
/// builds supervising different logical proxies would not contend.
pub fn candidate_lock_paths() -> Vec<PathBuf> {
    let name = format!("proximitm-{PROXY_LISTEN_PORT}.lock");
    let mut paths = Vec::new();
    if let Ok(rt) = env::var("XDG_RUNTIME_DIR") {
        if !rt.is_empty() {
            paths.push(PathBuf::from(rt).join(&name));
        }
    }
    paths.push(env::temp_dir().join(&name));
    paths
}

/// Acquire the lifecycle lock at the first workable candidate path, waiting
/// up to `wait` for a holder to release it.
pub fn acquire_lock(wait: Duration) -> io::Result<LifecycleLock> {
    let mut last_err: Option<io::Error> = None;
    for p in candidate_lock_paths() {
        match acquire_lock_at_with_timeout(&p, wait) {
            Ok(lock) => return Ok(lock),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Err(e),
            Err(e) => {
                last_err = Some(e);
                continue;
            }
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::other("failed to create lifecycle lock file in any candidate location")
    }))
}

/// Acquire an exclusive lock at a specific path immediately or fail.
pub fn acquire_lock_at(p: &Path) -> io::Result<LifecycleLock> {
    acquire_lock_at_with_timeout(p, Duration::ZERO)
}

/// Acquire an exclusive lock at a specific path, retrying a held lock with
/// fixed spacing until `wait` expires. Expiry surfaces as WouldBlock with a
/// message naming the concurrent operation.
pub fn acquire_lock_at_with_timeout(p: &Path, wait: Duration) -> io::Result<LifecycleLock> {
    if let Some(parent) = p.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let deadline = Instant::now() + wait;
    loop {
        let f = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(p)?;
        match f.try_lock_exclusive() {
            Ok(_) => {
                return Ok(LifecycleLock {
                    file: f,
                    path: p.to_path_buf(),
                })
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    return Err(io::Error::new(
                        io::ErrorKind::WouldBlock,
                        "another proxy lifecycle operation is in progress (lock held)",
                    ));
                }
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(e) => return Err(e),
        }
    }
}
