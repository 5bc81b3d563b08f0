//! The run's top-level entry point: `run_backup`.
//!
//! Wires together every other component into the nine-step sequence
//! from the run design: normalize the source, create the mirror/
//! history roots, open the catalogue, start the worker pool, drain
//! the enumerated source tree through it, then run the deletion sweep
//! if nothing has failed yet.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error};

use crate::enumerator;
use crate::error::BackupError;
use crate::processor;
use crate::progress::ProgressReporter;
use crate::queue::WorkQueue;
use crate::repository::StateRepository;
use crate::run::RunContext;
use crate::snapshot::SnapshotDir;
use crate::sweeper;
use crate::timestamp;

pub struct Config {
    pub source_dir: PathBuf,
    pub backup_root: PathBuf,
    pub catalogue_location: PathBuf,
    pub verbose: bool,
    pub progress_reporter: Option<ProgressReporter>,
}

/// Runs one backup. Returns `true` iff every enumerated file and the
/// deletion sweep completed without error; `false` on any setup or
/// per-file/sweep failure. Never panics or propagates an error out of
/// this boundary — all failure is reduced to this boolean.
pub fn run_backup(config: Config) -> bool {
    if config.verbose {
        debug!("verbose reporting requested for this run");
    }

    let backup_dir = config.backup_root.join("backup");
    let history_dir = config.backup_root.join("deleted");

    // Created unconditionally, even if the source turns out to be
    // invalid: a failed run still leaves the expected on-disk layout
    // in place, just empty.
    if let Err(err) = create_root(&backup_dir) {
        error!("{}", err);
        return false;
    }
    if let Err(err) = create_root(&history_dir) {
        error!("{}", err);
        return false;
    }

    let (source_root, scan_target) = match normalize_source(&config.source_dir) {
        Ok(pair) => pair,
        Err(err) => {
            error!("{}", err);
            return false;
        }
    };

    let repository = StateRepository::open(&config.catalogue_location);
    if let Err(err) = repository.initialize_schema() {
        error!("{}", err);
        return false;
    }

    // Captured here, on the caller's thread, before any worker thread
    // exists — `time::UtcOffset::current_local_offset` cannot be
    // trusted once the process is multi-threaded.
    let offset = timestamp::capture_offset();

    let snapshot = SnapshotDir::new(history_dir);
    let ctx = Arc::new(RunContext::new(
        source_root,
        backup_dir,
        repository,
        snapshot,
        offset,
        config.progress_reporter,
    ));

    let worker_count = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .max(1);

    let pool_ctx = Arc::clone(&ctx);
    let mut queue = WorkQueue::start(worker_count, move |file| {
        processor::process_file(&pool_ctx, &file);
    });

    enumerator::enumerate(&scan_target, |file| {
        queue.enqueue(file.to_path_buf());
    });
    queue.finalize();

    if !ctx.success() {
        return false;
    }

    sweeper::sweep(&ctx)
}

fn create_root(path: &Path) -> Result<(), BackupError> {
    std::fs::create_dir_all(path).map_err(|source| BackupError::BackupRootCreate {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the effective source root (the directory relative paths
/// are computed against) and the path to hand the enumerator. Done
/// once, here, at entry — the single canonicalization point so
/// catalogue keys stay stable across differently-spelled invocations
/// of the same source.
fn normalize_source(source_dir: &Path) -> Result<(PathBuf, PathBuf), BackupError> {
    let canonical = std::fs::canonicalize(source_dir)
        .map_err(|_| BackupError::SourceNotFound(source_dir.to_path_buf()))?;

    if canonical.is_file() {
        let root = canonical
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("/"));
        Ok((root, canonical))
    } else if canonical.is_dir() {
        Ok((canonical.clone(), canonical))
    } else {
        Err(BackupError::SourceNotFileOrDir(canonical))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn new_config(source: &Path, backup_root: &Path) -> Config {
        Config {
            source_dir: source.to_path_buf(),
            backup_root: backup_root.to_path_buf(),
            catalogue_location: backup_root.join("backup.db"),
            verbose: false,
            progress_reporter: None,
        }
    }

    #[test]
    fn initial_backup_of_small_tree() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();

        fs::write(src.path().join("file1.txt"), b"content1").unwrap();
        fs::create_dir(src.path().join("subdir")).unwrap();
        fs::write(src.path().join("subdir").join("file2.txt"), b"content2").unwrap();

        let ok = run_backup(new_config(src.path(), dst.path()));
        assert!(ok);

        assert_eq!(
            fs::read(dst.path().join("backup").join("file1.txt")).unwrap(),
            b"content1"
        );
        assert_eq!(
            fs::read(dst.path().join("backup").join("subdir").join("file2.txt")).unwrap(),
            b"content2"
        );

        let deleted_entries: Vec<_> = fs::read_dir(dst.path().join("deleted")).unwrap().collect();
        assert!(deleted_entries.is_empty());
    }

    #[test]
    fn incremental_modify_add_delete() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();

        fs::write(src.path().join("file1.txt"), b"content1").unwrap();
        fs::write(src.path().join("file2.txt"), b"content2").unwrap();

        assert!(run_backup(new_config(src.path(), dst.path())));

        fs::write(src.path().join("file1.txt"), b"modified content").unwrap();
        fs::write(src.path().join("file3.txt"), b"new file").unwrap();
        fs::remove_file(src.path().join("file2.txt")).unwrap();

        assert!(run_backup(new_config(src.path(), dst.path())));

        assert_eq!(
            fs::read(dst.path().join("backup").join("file1.txt")).unwrap(),
            b"modified content"
        );
        assert_eq!(
            fs::read(dst.path().join("backup").join("file3.txt")).unwrap(),
            b"new file"
        );
        assert!(!dst.path().join("backup").join("file2.txt").exists());

        let snapshot_dirs: Vec<_> = fs::read_dir(dst.path().join("deleted"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(snapshot_dirs.len(), 1);

        let snapshot = &snapshot_dirs[0];
        assert_eq!(fs::read(snapshot.join("file1.txt")).unwrap(), b"content1");
        assert_eq!(fs::read(snapshot.join("file2.txt")).unwrap(), b"content2");
        assert_eq!(fs::read_dir(snapshot).unwrap().count(), 2);
    }

    #[test]
    fn unchanged_run_creates_no_snapshot() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        fs::write(src.path().join("file1.txt"), b"content1").unwrap();

        assert!(run_backup(new_config(src.path(), dst.path())));
        assert!(run_backup(new_config(src.path(), dst.path())));

        let deleted_entries: Vec<_> = fs::read_dir(dst.path().join("deleted")).unwrap().collect();
        assert!(deleted_entries.is_empty());
    }

    #[test]
    fn single_file_source() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        let file = src.path().join("single.txt");
        fs::write(&file, b"single file content").unwrap();

        assert!(run_backup(new_config(&file, dst.path())));
        assert_eq!(
            fs::read(dst.path().join("backup").join("single.txt")).unwrap(),
            b"single file content"
        );
    }

    #[test]
    fn repeated_deletion_keeps_one_snapshot_dir() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        fs::write(src.path().join("file1.txt"), b"content1").unwrap();

        assert!(run_backup(new_config(src.path(), dst.path())));

        fs::remove_file(src.path().join("file1.txt")).unwrap();
        assert!(run_backup(new_config(src.path(), dst.path())));

        let snapshot_dirs: Vec<_> = fs::read_dir(dst.path().join("deleted"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(snapshot_dirs.len(), 1);
        assert_eq!(fs::read(snapshot_dirs[0].join("file1.txt")).unwrap(), b"content1");

        // Running again with nothing left to delete must not create a
        // second snapshot directory.
        assert!(run_backup(new_config(src.path(), dst.path())));
        let snapshot_dirs_again: Vec<_> = fs::read_dir(dst.path().join("deleted"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(snapshot_dirs_again.len(), 1);
        assert_eq!(snapshot_dirs_again[0], snapshot_dirs[0]);
    }

    #[test]
    fn nonexistent_source_fails_but_creates_roots() {
        let dst = tempdir().unwrap();
        let missing = dst.path().join("does-not-exist");

        let ok = run_backup(new_config(&missing, dst.path()));
        assert!(!ok);

        assert!(dst.path().join("backup").is_dir());
        assert!(dst.path().join("deleted").is_dir());
        assert_eq!(fs::read_dir(dst.path().join("backup")).unwrap().count(), 0);
        assert_eq!(fs::read_dir(dst.path().join("deleted")).unwrap().count(), 0);
    }

    #[test]
    fn resurrection_after_delete_is_added_not_unchanged() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        fs::write(src.path().join("file1.txt"), b"content1").unwrap();

        assert!(run_backup(new_config(src.path(), dst.path())));
        fs::remove_file(src.path().join("file1.txt")).unwrap();
        assert!(run_backup(new_config(src.path(), dst.path())));

        // Reintroduce identical bytes.
        fs::write(src.path().join("file1.txt"), b"content1").unwrap();
        assert!(run_backup(new_config(src.path(), dst.path())));

        let repo = StateRepository::open(&dst.path().join("backup.db"));
        let entry = repo.get("file1.txt").unwrap().unwrap();
        assert_eq!(entry.status, crate::model::ChangeStatus::Added);
    }

    #[test]
    fn progress_reporter_sees_monotonic_collecting_counts() {
        let src = tempdir().unwrap();
        let dst = tempdir().unwrap();
        for i in 0..20 {
            fs::write(src.path().join(format!("f{i}.txt")), format!("v{i}")).unwrap();
        }

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        let mut config = new_config(src.path(), dst.path());
        config.progress_reporter = Some(Box::new(move |event| {
            seen_clone.lock().unwrap().push(event.processed);
        }));

        assert!(run_backup(config));

        let processed = seen.lock().unwrap().clone();
        assert_eq!(processed.len(), 20);
        let mut sorted = processed.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 20, "processed counts must be unique/monotonic");
    }
}
