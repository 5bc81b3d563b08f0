//! Shared per-run state: the pieces the processor and sweeper both
//! need, plus the atomics/mutex that let many worker threads fold
//! their outcomes into one run-level result.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use time::UtcOffset;

use crate::error::Result;
use crate::progress::{ProgressEvent, ProgressReporter, STAGE_COLLECTING, STAGE_DELETED};
use crate::repository::StateRepository;
use crate::snapshot::SnapshotDir;
use crate::timestamp;

struct Reporting {
    processed: u64,
    reporter: Option<ProgressReporter>,
}

pub struct RunContext {
    pub source_root: PathBuf,
    pub backup_root: PathBuf,
    pub repository: StateRepository,
    pub snapshot: SnapshotDir,
    offset: UtcOffset,
    success: AtomicBool,
    reporting: Mutex<Reporting>,
}

impl RunContext {
    pub fn new(
        source_root: PathBuf,
        backup_root: PathBuf,
        repository: StateRepository,
        snapshot: SnapshotDir,
        offset: UtcOffset,
        reporter: Option<ProgressReporter>,
    ) -> Self {
        Self {
            source_root,
            backup_root,
            repository,
            snapshot,
            offset,
            success: AtomicBool::new(true),
            reporting: Mutex::new(Reporting { processed: 0, reporter }),
        }
    }

    pub fn mark_failed(&self) {
        self.success.store(false, Ordering::SeqCst);
    }

    pub fn success(&self) -> bool {
        self.success.load(Ordering::SeqCst)
    }

    /// The run's timestamp, at the offset captured once on the main
    /// thread before the worker pool started. Safe to call from any
    /// worker thread, unlike `time::UtcOffset::current_local_offset`.
    pub fn timestamp(&self) -> String {
        timestamp::format(self.offset)
    }

    /// The run's snapshot directory, created lazily on first demand.
    /// Thin wrapper over [`SnapshotDir::get_or_create`] that supplies
    /// the run's pre-captured offset.
    pub fn snapshot_dir(&self) -> Result<&Path> {
        self.snapshot.get_or_create(self.offset)
    }

    /// Reserves the next `processed` count and invokes the reporter, if
    /// any, in the same critical section. Reservation and delivery must
    /// stay atomic together: splitting them would let a thread reserve
    /// a low count, stall, and report it after a higher count has
    /// already gone out, breaking the strictly-increasing guarantee
    /// worker concurrency would otherwise violate.
    pub fn report_collecting(&self, file: &Path) {
        let mut guard = self.reporting.lock().expect("progress reporter mutex poisoned");
        guard.processed += 1;
        let event = ProgressEvent {
            stage: STAGE_COLLECTING,
            processed: guard.processed,
            total: 0,
            file: file.to_path_buf(),
        };
        if let Some(reporter) = guard.reporter.as_ref() {
            reporter(&event);
        }
    }

    /// Reports a single deletion-sweep event. Shares the same mutex as
    /// [`Self::report_collecting`] so the two stages never interleave
    /// out of order in the stream a caller observes.
    pub fn report_deleted(&self, file: &Path) {
        let guard = self.reporting.lock().expect("progress reporter mutex poisoned");
        let event = ProgressEvent {
            stage: STAGE_DELETED,
            processed: 0,
            total: 0,
            file: file.to_path_buf(),
        };
        if let Some(reporter) = guard.reporter.as_ref() {
            reporter(&event);
        }
    }
}
