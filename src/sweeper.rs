//! Deletion detection: runs once, single-threaded, after every worker
//! in the queue has joined. Walks a snapshot read of the whole
//! catalogue and archives/retires any entry whose source file is gone.

use std::path::Path;

use log::{debug, warn};

use crate::model::ChangeStatus;
use crate::run::RunContext;

/// Returns `true` iff the sweep completed with no failures. Should
/// only be invoked when the run is still successful going in — a
/// failed enumeration/processing phase skips the sweep entirely.
pub fn sweep(ctx: &RunContext) -> bool {
    let entries = match ctx.repository.list_all() {
        Ok(entries) => entries,
        Err(err) => {
            warn!("failed to read catalogue for deletion sweep: {}", err);
            return false;
        }
    };

    for entry in entries {
        if entry.status == ChangeStatus::Deleted {
            continue;
        }

        let source_path = ctx.source_root.join(&entry.path);
        if source_path.exists() {
            continue;
        }

        let backup_path = ctx.backup_root.join(&entry.path);
        if backup_path.exists() {
            let snapshot_dir = match ctx.snapshot_dir() {
                Ok(dir) => dir,
                Err(err) => {
                    warn!("failed to create snapshot directory during sweep: {}", err);
                    return false;
                }
            };

            let dest = snapshot_dir.join(&entry.path);
            if let Some(parent) = dest.parent() {
                if let Err(err) = std::fs::create_dir_all(parent) {
                    warn!("failed to create snapshot parent for {}: {}", entry.path, err);
                }
            }
            if let Err(err) = std::fs::copy(&backup_path, &dest) {
                warn!("failed to archive {} before deletion: {}", entry.path, err);
            } else if let Err(err) = std::fs::remove_file(&backup_path) {
                warn!("failed to remove mirror copy of {}: {}", entry.path, err);
            }
        }

        let timestamp = ctx.timestamp();
        if let Err(err) = ctx.repository.mark_deleted(&entry.path, &timestamp) {
            warn!("catalogue update failed while marking {} deleted: {}", entry.path, err);
            return false;
        }

        debug!("{} marked deleted", entry.path);
        ctx.report_deleted(Path::new(&entry.path));
    }

    true
}
