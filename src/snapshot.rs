//! Lazily-created, single-assignment per-run snapshot directory.
//!
//! At most one timestamped directory under `deleted/` is created per
//! run, on first demand — not at run start, so a run that touches
//! nothing (P3) leaves `deleted/` untouched. The timestamp is fixed at
//! the instant of first demand. Concurrent first callers all block on
//! the same initializer and observe the same path.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use time::UtcOffset;

use crate::error::{BackupError, Result};
use crate::timestamp;

pub struct SnapshotDir {
    history_root: PathBuf,
    cell: OnceLock<PathBuf>,
}

impl SnapshotDir {
    pub fn new(history_root: PathBuf) -> Self {
        Self {
            history_root,
            cell: OnceLock::new(),
        }
    }

    /// Returns the run's snapshot directory, creating it (including
    /// parents) on the first call across all threads. `offset` is the
    /// run's pre-captured local UTC offset (see [`crate::timestamp`]) —
    /// this may run on any worker thread, so it never computes its own.
    pub fn get_or_create(&self, offset: UtcOffset) -> Result<&Path> {
        if let Some(path) = self.cell.get() {
            return Ok(path);
        }

        let candidate = self.history_root.join(timestamp::format(offset));
        std::fs::create_dir_all(&candidate).map_err(|source| BackupError::Io {
            path: candidate.clone(),
            source,
        })?;

        // Another thread may have won the race and already set the
        // cell; `get_or_init` guarantees a single winner either way.
        let path = self.cell.get_or_init(|| candidate);
        Ok(path)
    }

    /// True iff `get_or_create` has been called at least once.
    pub fn was_created(&self) -> bool {
        self.cell.get().is_some()
    }
}
