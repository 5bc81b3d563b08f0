//! Per-file classification, archiving, and catalogue update.
//!
//! This is the callback the work queue's workers run for every
//! enumerated file. It never panics on an ordinary failure — each step
//! below clears the run's shared success flag and returns early,
//! leaving the remaining steps (and the remaining queued files) alone.

use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::digest;
use crate::model::ChangeStatus;
use crate::run::RunContext;

pub fn process_file(ctx: &RunContext, file: &Path) {
    let rel_path = match relative_path(file, &ctx.source_root) {
        Some(p) => p,
        None => {
            warn!("{} is not under the source root, skipping", file.display());
            ctx.mark_failed();
            return;
        }
    };

    let new_hash = match digest::digest(file) {
        Ok(h) => h,
        Err(err) => {
            warn!("failed to hash {}: {}", file.display(), err);
            ctx.mark_failed();
            return;
        }
    };

    let prior = match ctx.repository.get(&rel_path) {
        Ok(entry) => entry,
        Err(err) => {
            warn!("catalogue read failed for {}: {}", rel_path, err);
            ctx.mark_failed();
            return;
        }
    };

    // A Deleted prior is treated as no prior at all: re-observing a
    // path that was previously deleted resurrects it as Added, not
    // Unchanged, even if the bytes happen to match what was there
    // before deletion.
    let prior = prior.filter(|entry| entry.status != ChangeStatus::Deleted);

    let backup_path = ctx.backup_root.join(&rel_path);

    let (new_status, new_timestamp) = match &prior {
        None => {
            if let Err(err) = copy_into_mirror(file, &backup_path) {
                warn!("failed to copy {} into mirror: {}", file.display(), err);
            }
            (ChangeStatus::Added, ctx.timestamp())
        }
        Some(entry) if entry.hash != new_hash => {
            if archive_previous_version(ctx, &rel_path, &backup_path) == ArchiveOutcome::SnapshotUnavailable {
                // The snapshot directory itself couldn't be created —
                // a per-file error. Abandon this file entirely: no
                // mirror overwrite, no catalogue update, no progress
                // event, so the prior (correct) catalogue row stands.
                return;
            }
            if let Err(err) = copy_into_mirror(file, &backup_path) {
                warn!("failed to copy {} into mirror: {}", file.display(), err);
            }
            (ChangeStatus::Modified, ctx.timestamp())
        }
        Some(entry) => (ChangeStatus::Unchanged, entry.last_updated.clone()),
    };

    if let Err(err) = ctx.repository.upsert(&rel_path, &new_hash, new_status, &new_timestamp) {
        warn!("catalogue write failed for {}: {}", rel_path, err);
        ctx.mark_failed();
        return;
    }

    debug!("{} classified as {}", rel_path, new_status);

    ctx.report_collecting(file);
}

/// Computes the source-relative path used as the catalogue key,
/// normalized to forward slashes. The sentinel case of a single-file
/// source (where `relative` evaluates to `"."`) uses the file's own
/// name instead.
fn relative_path(file: &Path, source_root: &Path) -> Option<String> {
    let rel = file.strip_prefix(source_root).ok()?;
    let rel = if rel.as_os_str().is_empty() {
        Path::new(file.file_name()?)
    } else {
        rel
    };

    let normalized: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(normalized.join("/"))
}

fn copy_into_mirror(source: &Path, backup_path: &Path) -> std::io::Result<()> {
    if let Some(parent) = backup_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(source, backup_path)?;
    Ok(())
}

#[derive(PartialEq, Eq)]
enum ArchiveOutcome {
    /// Archived, or there was nothing to archive (no prior mirror copy
    /// existed). Either way the caller may proceed with this file.
    Done,
    /// The run's snapshot directory could not be created. A per-file
    /// error per the run's error-handling design: the caller must
    /// abandon the rest of this file's processing.
    SnapshotUnavailable,
}

/// Copies the mirror's *current* (pre-update) bytes into this run's
/// snapshot directory, then returns so the caller can overwrite the
/// mirror with the new content. If the mirror file is unexpectedly
/// absent (e.g. deleted by something outside this tool), the snapshot
/// step is skipped silently — per the open question in the design
/// notes, there is nothing to snapshot in that case. A failure to
/// create the directory itself or to copy into it that happens *after*
/// the directory exists is a filesystem best-effort error: it is
/// logged but does not abandon the file.
fn archive_previous_version(ctx: &RunContext, rel_path: &str, backup_path: &Path) -> ArchiveOutcome {
    if !backup_path.exists() {
        return ArchiveOutcome::Done;
    }

    let snapshot_dir = match ctx.snapshot_dir() {
        Ok(dir) => dir,
        Err(err) => {
            warn!("failed to create snapshot directory: {}", err);
            ctx.mark_failed();
            return ArchiveOutcome::SnapshotUnavailable;
        }
    };

    let dest: PathBuf = snapshot_dir.join(rel_path);
    if let Some(parent) = dest.parent() {
        if let Err(err) = std::fs::create_dir_all(parent) {
            warn!("failed to create snapshot parent for {}: {}", rel_path, err);
        }
    }
    if let Err(err) = std::fs::copy(backup_path, &dest) {
        warn!("failed to archive previous version of {}: {}", rel_path, err);
    }

    ArchiveOutcome::Done
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_path_normalizes_separators() {
        let root = Path::new("/src");
        let file = Path::new("/src/sub/dir/file.txt");
        assert_eq!(relative_path(file, root).unwrap(), "sub/dir/file.txt");
    }

    #[test]
    fn relative_path_single_file_source_uses_filename() {
        let root = Path::new("/src/single.txt");
        let file = Path::new("/src/single.txt");
        assert_eq!(relative_path(file, root).unwrap(), "single.txt");
    }

    #[test]
    fn relative_path_outside_root_is_none() {
        let root = Path::new("/src");
        let file = Path::new("/other/file.txt");
        assert!(relative_path(file, root).is_none());
    }
}
