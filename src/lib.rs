//! `snapback` — an incremental, snapshot-based file backup engine.
//!
//! Given a source tree and a backup root, [`run_backup`] mirrors the
//! current state of the source into `backup/` and preserves previous
//! content of modified or deleted files inside per-run timestamped
//! directories under `deleted/`. A small SQLite catalogue records, per
//! source-relative path, the last content hash, status, and
//! last-update timestamp, so each run can classify files against the
//! previous one without re-reading the whole tree's history.
//!
//! # Module layout
//!
//! | Module        | Responsibility                                         |
//! |----------------|---------------------------------------------------------|
//! | [`timestamp`]  | Filesystem-safe local-time stamps                       |
//! | [`digest`]     | Streaming xxHash content fingerprint                     |
//! | [`enumerator`] | Recursive regular-file walk                              |
//! | [`snapshot`]   | Lazily-created, single-assignment per-run snapshot dir   |
//! | [`repository`] | SQLite-backed catalogue, one connection per worker thread|
//! | [`queue`]      | Bounded FIFO + fixed worker pool                         |
//! | [`processor`]  | Per-file classify/archive/mirror/catalogue pipeline      |
//! | [`sweeper`]    | Post-drain deletion detection                            |
//! | [`coordinator`]| [`run_backup`], the top-level entry point                |

pub mod coordinator;
pub mod digest;
pub mod enumerator;
pub mod error;
pub mod model;
pub mod processor;
pub mod progress;
pub mod queue;
pub mod repository;
pub mod run;
pub mod snapshot;
pub mod sweeper;
pub mod timestamp;

pub use coordinator::{run_backup, Config};
pub use error::{BackupError, Result};
pub use model::{CatalogueEntry, ChangeStatus};
pub use progress::{ProgressEvent, ProgressReporter};
