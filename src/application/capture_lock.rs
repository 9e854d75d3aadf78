//! Exclusive ownership of the capture device

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tracing::{debug, warn};

/// Lock file guarding the system microphone across processes
const LOCK_FILE_NAME: &str = "voice-memo-capture.lock";

/// Shared flag guarding a capture device. Sessions that share a device
/// must share a lock; at most one [`CaptureLease`] exists per lock.
///
/// A lock with a lock file also excludes other processes: the lease holder
/// writes its PID there, the way a daemon PID file works.
#[derive(Debug, Clone, Default)]
pub struct CaptureLock {
    held: Arc<AtomicBool>,
    lock_file: Option<Arc<PathBuf>>,
}

impl CaptureLock {
    /// A lock private to its clones (tests, alternative devices)
    pub fn new() -> Self {
        Self::default()
    }

    /// A lock that is also claimed on disk at `path`
    pub fn with_lock_file(path: impl Into<PathBuf>) -> Self {
        Self {
            held: Arc::default(),
            lock_file: Some(Arc::new(path.into())),
        }
    }

    /// Per-user runtime directory, falling back to the temp directory
    pub fn default_lock_path() -> PathBuf {
        dirs::runtime_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(LOCK_FILE_NAME)
    }

    /// The lock for the system microphone, shared by every session in this
    /// process and with other processes through [`default_lock_path`](Self::default_lock_path).
    pub fn global() -> Self {
        static GLOBAL: OnceLock<CaptureLock> = OnceLock::new();
        GLOBAL
            .get_or_init(|| CaptureLock::with_lock_file(Self::default_lock_path()))
            .clone()
    }

    pub fn lock_file(&self) -> Option<&Path> {
        self.lock_file.as_deref().map(PathBuf::as_path)
    }

    /// Take the device, or `None` if another session holds it
    pub fn try_acquire(&self) -> Option<CaptureLease> {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;

        let mut lease = CaptureLease {
            held: Arc::clone(&self.held),
            lock_file: None,
        };
        if let Some(path) = &self.lock_file {
            if !claim_lock_file(path) {
                return None;
            }
            lease.lock_file = Some(Arc::clone(path));
        }
        Some(lease)
    }

    /// Whether a lease from this lock is alive in this process
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

/// Proof of exclusive access; the device is released when this drops.
#[derive(Debug)]
pub struct CaptureLease {
    held: Arc<AtomicBool>,
    lock_file: Option<Arc<PathBuf>>,
}

impl Drop for CaptureLease {
    fn drop(&mut self) {
        if let Some(path) = self.lock_file.take() {
            if let Err(e) = fs::remove_file(path.as_path()) {
                warn!(error = %e, path = %path.display(), "failed to remove capture lock");
            }
        }
        self.held.store(false, Ordering::Release);
    }
}

/// Create the lock file with our PID. A file left by a dead process is
/// replaced; an unreadable or empty one counts as held.
fn claim_lock_file(path: &Path) -> bool {
    for _ in 0..2 {
        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(mut file) => {
                if let Err(e) = write!(file, "{}", process::id()) {
                    warn!(error = %e, path = %path.display(), "failed to write capture lock");
                    let _ = fs::remove_file(path);
                    return false;
                }
                return true;
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => match lock_owner(path) {
                Some(pid) if process_alive(pid) => {
                    debug!(pid, "capture device held by another process");
                    return false;
                }
                Some(pid) => {
                    debug!(pid, "removing stale capture lock");
                    let _ = fs::remove_file(path);
                }
                None => return false,
            },
            Err(e) => {
                warn!(error = %e, path = %path.display(), "failed to create capture lock");
                return false;
            }
        }
    }
    false
}

fn lock_owner(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

// Without procfs every recorded owner is assumed alive
#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    true
}
