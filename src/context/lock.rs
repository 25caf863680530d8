// src/context/lock.rs

//! Symlink-based mutual exclusion for the context pending directory.
//!
//! The lock is a symlink whose creation is atomic: whoever creates it owns
//! the directory. On contention the acquirer sleeps one second per retry,
//! and once retries are exhausted it force-breaks the existing link (the
//! holder is assumed dead) and tries once more. This is a best-effort,
//! non-fair lock for low-contention administrative tooling, not a strict
//! mutex. Released on drop.

use crate::error::{Error, Result};
use std::io::ErrorKind;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Name of the lock symlink inside a locked directory
pub const LOCK_NAME: &str = ".lock";

/// An acquired directory lock; the symlink is removed on drop
#[derive(Debug)]
pub struct DirLock {
    path: PathBuf,
}

impl DirLock {
    /// Acquire the lock for `dir`, waiting up to `timeout_secs` seconds.
    ///
    /// Each failed attempt sleeps one second. When the retries are
    /// exhausted the existing link is force-broken and creation is retried
    /// once; if even that fails the error is [`Error::LockTimeout`].
    pub fn acquire(dir: &Path, timeout_secs: u32) -> Result<Self> {
        let path = dir.join(LOCK_NAME);
        // Link target records the owner for post-mortem inspection
        let target = format!("pid.{}", std::process::id());

        let mut retries = timeout_secs;
        loop {
            match symlink(&target, &path) {
                Ok(()) => {
                    debug!(path = %path.display(), "acquired directory lock");
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if retries == 0 {
                        break;
                    }
                    retries -= 1;
                    thread::sleep(Duration::from_secs(1));
                }
                Err(e) => return Err(e.into()),
            }
        }

        // Retries exhausted: assume the holder died and break the lock
        warn!(path = %path.display(), "breaking stale directory lock");
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        match symlink(&target, &path) {
            Ok(()) => {
                debug!(path = %path.display(), "acquired directory lock after break");
                Ok(Self { path })
            }
            Err(_) => Err(Error::LockTimeout(path)),
        }
    }

    /// True if a lock symlink currently exists for `dir`
    pub fn is_held(dir: &Path) -> bool {
        dir.join(LOCK_NAME).symlink_metadata().is_ok()
    }

    /// Path of the lock symlink
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to release directory lock");
            }
        } else {
            debug!(path = %self.path.display(), "released directory lock");
        }
    }
}
