//! Cross-process store locking.
//!
//! Overlapping scheduled invocations must not both mutate the record set.
//! A sentinel lock file next to the store (`<store>.lock`) is locked
//! exclusively for the duration of a batch; acquisition waits a short
//! bounded period and then gives up, so a second invocation aborts
//! instead of queueing behind the first.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use fs2::FileExt;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::types::StoreError;

const RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Holds the exclusive lock on the store until dropped.
#[derive(Debug)]
pub struct StoreLockGuard {
    _file: File,
    lock_path: PathBuf,
    sidecar_path: Option<PathBuf>,
}

impl StoreLockGuard {
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }
}

impl Drop for StoreLockGuard {
    fn drop(&mut self) {
        if let Some(sidecar) = &self.sidecar_path {
            let _ = fs::remove_file(sidecar);
        }
        debug!("Released store lock {:?}", self.lock_path);
    }
}

/// Diagnostics written next to the lock so an operator can see who holds it.
#[derive(Serialize)]
struct LockSidecar {
    pid: u32,
    timestamp: String,
}

fn sidecar_path_for(lock_path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.json", lock_path.display()))
}

fn write_sidecar(lock_path: &Path) -> Option<PathBuf> {
    let sidecar = LockSidecar {
        pid: std::process::id(),
        timestamp: Utc::now().to_rfc3339(),
    };
    let sidecar_path = sidecar_path_for(lock_path);
    match serde_json::to_vec_pretty(&sidecar)
        .map_err(io::Error::other)
        .and_then(|payload| fs::write(&sidecar_path, payload))
    {
        Ok(()) => Some(sidecar_path),
        Err(e) => {
            warn!("Failed to write lock sidecar {:?}: {}", sidecar_path, e);
            None
        }
    }
}

pub fn lock_path_for(store_path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.lock", store_path.display()))
}

/// Acquire the exclusive lock for `store_path`, waiting at most `timeout`.
pub async fn acquire(store_path: &Path, timeout: Duration) -> Result<StoreLockGuard, StoreError> {
    let lock_path = lock_path_for(store_path);
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|source| StoreError::LockFile {
            path: lock_path.clone(),
            source,
        })?;

    let deadline = Instant::now() + timeout;
    loop {
        match file.try_lock_exclusive() {
            Ok(()) => break,
            Err(_) if Instant::now() < deadline => {
                tokio::time::sleep(RETRY_INTERVAL).await;
            }
            Err(_) => {
                warn!("Could not acquire store lock {:?} within {:?}", lock_path, timeout);
                return Err(StoreError::LockTimeout(lock_path));
            }
        }
    }
    debug!("Acquired store lock {:?}", lock_path);

    let sidecar_path = write_sidecar(&lock_path);
    Ok(StoreLockGuard {
        _file: file,
        lock_path,
        sidecar_path,
    })
}
