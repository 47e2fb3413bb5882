//! Advisory lock serializing access to a store file.
//!
//! The store file itself is replaced by rename on every write, so the
//! lock lives on a sidecar `<store>.lock` file whose inode never
//! changes.  Writers take it exclusively, readers take it shared.
//! Acquisition polls with a bounded wait and gives up with
//! `LockTimeout` instead of blocking forever.

use std::fs::{File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crate::errors::{CredVaultError, Result};

/// How the lock is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Many readers at once; excludes writers.
    Shared,
    /// A single writer; excludes everyone else.
    Exclusive,
}

/// Bounded-wait policy for lock acquisition.
#[derive(Debug, Clone, Copy)]
pub struct LockPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5_000),
            poll_interval: Duration::from_millis(25),
        }
    }
}

/// Guard that holds the lock for its lifetime.
///
/// Dropping the guard closes the file handle, which releases the lock.
#[derive(Debug)]
pub struct StoreLockGuard {
    file: File,
    mode: LockMode,
}

impl StoreLockGuard {
    pub fn mode(&self) -> LockMode {
        self.mode
    }
}

impl Drop for StoreLockGuard {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Path of the sidecar lock file for a store.
pub fn lock_path(store_path: &Path) -> PathBuf {
    let mut name = store_path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    store_path.with_file_name(name)
}

/// Acquire the lock for `store_path`, waiting at most `policy.timeout`.
///
/// Each call opens its own handle, so two acquisitions in the same
/// process contend exactly like two processes would.
pub fn acquire(store_path: &Path, mode: LockMode, policy: &LockPolicy) -> Result<StoreLockGuard> {
    let path = lock_path(store_path);
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)?;

    let started = Instant::now();
    let mut contended = false;
    loop {
        let attempt = match mode {
            LockMode::Shared => file.try_lock_shared(),
            LockMode::Exclusive => file.try_lock(),
        };

        match attempt {
            Ok(()) => {
                tracing::debug!(lock = %path.display(), ?mode, waited = ?started.elapsed(), "store lock acquired");
                return Ok(StoreLockGuard { file, mode });
            }
            Err(TryLockError::WouldBlock) => {
                if !contended {
                    tracing::warn!(lock = %path.display(), ?mode, "store lock is held elsewhere, waiting");
                    contended = true;
                }
            }
            Err(TryLockError::Error(e)) => return Err(CredVaultError::Io(e)),
        }

        let waited = started.elapsed();
        if waited >= policy.timeout {
            return Err(CredVaultError::LockTimeout(policy.timeout));
        }
        thread::sleep(policy.poll_interval.min(policy.timeout - waited));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn quick() -> LockPolicy {
        LockPolicy {
            timeout: Duration::from_millis(100),
            poll_interval: Duration::from_millis(10),
        }
    }

    #[test]
    fn lock_path_is_a_sidecar() {
        let path = lock_path(Path::new("/tmp/vault/s.cvlt"));
        assert_eq!(path, PathBuf::from("/tmp/vault/s.cvlt.lock"));
    }

    #[test]
    fn shared_locks_coexist() {
        let dir = TempDir::new().unwrap();
        let store = dir.path().join("s.cvlt");

        let a = acquire(&store, LockMode::Shared, &quick()).unwrap();
        let b = acquire(&store, LockMode::Shared, &quick()).unwrap();
        assert_eq!(a.mode(), LockMode::Shared);
        assert_eq!(b.mode(), LockMode::Shared);
    }

    #[test]
    fn exclusive_lock_times_out_while_held() {
        let dir = TempDir::new().unwrap();
        let store = dir.path().join("s.cvlt");

        let _held = acquire(&store, LockMode::Exclusive, &quick()).unwrap();
        let err = acquire(&store, LockMode::Exclusive, &quick()).unwrap_err();
        assert!(matches!(err, CredVaultError::LockTimeout(_)));

        let err = acquire(&store, LockMode::Shared, &quick()).unwrap_err();
        assert!(matches!(err, CredVaultError::LockTimeout(_)));
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = TempDir::new().unwrap();
        let store = dir.path().join("s.cvlt");

        drop(acquire(&store, LockMode::Exclusive, &quick()).unwrap());
        assert!(acquire(&store, LockMode::Exclusive, &quick()).is_ok());
    }
}
