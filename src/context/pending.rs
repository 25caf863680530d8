// src/context/pending.rs

//! Pending/active context transition.
//!
//! A context configuration directory holds two files: `pending`, edited by
//! operators, and `active`, the list last applied to the host. [`promote`]
//! compares the two and, when they differ, copies pending's content over
//! active and aligns active's mtime with pending's so later freshness
//! checks agree. The whole step runs under the directory lock.

use super::{ContextList, DirLock};
use crate::error::{Error, Result};
use filetime::FileTime;
use std::path::Path;
use std::time::SystemTime;
use tracing::{debug, info};

/// Operator-edited context file inside a configuration directory
pub const PENDING_FILE: &str = "pending";
/// Last-applied context file inside a configuration directory
pub const ACTIVE_FILE: &str = "active";

/// What [`promote`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromoteOutcome {
    /// Pending and active already agreed; nothing written
    Unchanged,
    /// Active was replaced by pending's content
    Promoted,
}

/// Promote `pending` to `active` in `dir` if the two differ.
///
/// The comparison uses the profile-directory-aware context diff with the
/// active file's mtime as the reference time, so a touched per-context
/// override file forces promotion even when the byte content agrees.
/// `lock_timeout_secs` bounds the wait for the directory lock.
pub fn promote(dir: &Path, lock_timeout_secs: u32) -> Result<PromoteOutcome> {
    let _lock = DirLock::acquire(dir, lock_timeout_secs)?;

    let pending_path = dir.join(PENDING_FILE);
    let active_path = dir.join(ACTIVE_FILE);

    let pending = ContextList::load(&pending_path, false)?;
    let active = ContextList::load(&active_path, true)?;

    let reference = match std::fs::metadata(&active_path) {
        Ok(meta) => meta.modified()?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => SystemTime::UNIX_EPOCH,
        Err(e) => return Err(e.into()),
    };

    let active_exists = active_path.exists();
    if active_exists && !pending.diff(&active, Some(dir), Some(reference)) {
        debug!(dir = %dir.display(), "contexts unchanged, not promoting");
        return Ok(PromoteOutcome::Unchanged);
    }

    // Byte-for-byte copy via temp + rename; active's mtime is aligned to
    // pending's regardless of whether the byte content changed.
    let content = std::fs::read(&pending_path)?;
    let pending_mtime = std::fs::metadata(&pending_path)?.modified()?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    std::io::Write::write_all(&mut tmp, &content)?;
    tmp.persist(&active_path).map_err(|e| Error::Io(e.error))?;
    filetime::set_file_mtime(&active_path, FileTime::from_system_time(pending_mtime))?;

    info!(dir = %dir.display(), "promoted pending contexts");
    Ok(PromoteOutcome::Promoted)
}

/// Load the active context list for `dir`, empty when never promoted
pub fn load_active(dir: &Path) -> Result<ContextList> {
    ContextList::load(&dir.join(ACTIVE_FILE), true)
}

/// Load the pending context list for `dir`
pub fn load_pending(dir: &Path) -> Result<ContextList> {
    ContextList::load(&dir.join(PENDING_FILE), false).map_err(|e| {
        if e.is_not_found() {
            Error::Parse(format!(
                "no pending context file in {}",
                dir.display()
            ))
        } else {
            e
        }
    })
}
