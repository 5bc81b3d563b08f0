//! Crate-wide error type.
//!
//! Mirrors the four error kinds from the run's error-handling design:
//! setup, per-file, filesystem best-effort, and sweep errors. Only
//! setup errors abort the run directly; the rest are folded into the
//! run's boolean success flag by the caller.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BackupError>;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("source path does not exist: {0}")]
    SourceNotFound(PathBuf),

    #[error("source path is neither a file nor a directory: {0}")]
    SourceNotFileOrDir(PathBuf),

    #[error("failed to create backup root {path}: {source}")]
    BackupRootCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalogue schema initialization failed: {0}")]
    SchemaInit(#[source] rusqlite::Error),

    #[error("catalogue error for {path}: {source}")]
    Catalogue {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("could not hash {path}: {source}")]
    Digest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
