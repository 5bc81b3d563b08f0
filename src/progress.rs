//! Progress reporting types.
//!
//! The stage strings are bit-exact per the external interface: other
//! tooling may match on them literally, so they are plain `&'static
//! str`, not a `Display`-derived enum whose text could drift.

use std::path::PathBuf;

pub const STAGE_COLLECTING: &str = "collecting";
pub const STAGE_DELETED: &str = "deleted";

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub stage: &'static str,
    pub processed: u64,
    pub total: u64,
    pub file: PathBuf,
}

/// Callback invoked once per processed or swept file. Invoked under a
/// single mutex owned by the run coordinator, so callers see a
/// serialized stream even though processing happens on worker threads.
pub type ProgressReporter = Box<dyn Fn(&ProgressEvent) + Send + Sync>;
