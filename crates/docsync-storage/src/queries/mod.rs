//! Query modules, one per table.

pub mod cursor_ops;
pub mod document_ops;
pub mod index_ops;
pub mod queue_ops;
pub mod status_ops;

use chrono::{DateTime, SecondsFormat, Utc};

use docsync_core::errors::DocSyncResult;

use crate::corrupt_row;

/// Timestamps are stored as RFC 3339 with a fixed nanosecond fraction so
/// string order equals time order and round-trips are lossless.
pub(crate) fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn parse_ts(table: &str, raw: &str) -> DocSyncResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt_row(table, format!("parse datetime '{raw}': {e}")))
}

pub(crate) fn parse_opt_ts(table: &str, raw: Option<String>) -> DocSyncResult<Option<DateTime<Utc>>> {
    raw.as_deref().map(|s| parse_ts(table, s)).transpose()
}
