//! Regular-file enumeration.
//!
//! `enumerate` yields every regular file reachable from a path: the
//! path itself if it names a file, or a recursive walk if it names a
//! directory. Symlinked directories are never followed, so a cycle
//! introduced by a symlink can't cause unbounded recursion. Permission
//! errors on subtrees are logged and skipped rather than propagated —
//! one unreadable directory shouldn't abort the whole backup.

use std::path::Path;

use walkdir::WalkDir;

/// Invokes `on_file` once for every regular file reachable from `path`.
pub fn enumerate(path: &Path, mut on_file: impl FnMut(&Path)) {
    if path.is_file() {
        on_file(path);
        return;
    }

    for entry in WalkDir::new(path).follow_links(false) {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() {
                    on_file(entry.path());
                }
            }
            Err(err) => {
                log::warn!("skipping unreadable entry during enumeration: {}", err);
            }
        }
    }
}
