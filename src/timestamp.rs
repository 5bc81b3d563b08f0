//! Filesystem-safe local-time timestamps.
//!
//! Every catalogue row and every snapshot directory name is stamped
//! with the same `YYYY-MM-DD_HH-MM-SS` format produced here.
//!
//! `time::UtcOffset::current_local_offset` can only be trusted from a
//! single-threaded process — once other threads exist, the platform
//! call it's built on is no longer safe to make and `time` refuses it.
//! Worker threads calling it directly would silently fall back to UTC
//! on every timestamp, so the offset is captured once on the main
//! thread, before the worker pool starts, and threaded through
//! [`RunContext`](crate::run::RunContext) from there.

use time::format_description::FormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

const FORMAT: &[FormatItem<'_>] =
    format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");

/// Captures the process's local UTC offset. Must be called before any
/// worker thread is spawned — falls back to UTC if the platform can't
/// report an offset at all (e.g. some containers).
pub fn capture_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

/// Current time at `offset`, formatted as `YYYY-MM-DD_HH-MM-SS`.
pub fn format(offset: UtcOffset) -> String {
    OffsetDateTime::now_utc()
        .to_offset(offset)
        .format(FORMAT)
        .expect("fixed-width timestamp format never fails")
}
