//! Per-scope sync cursors.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use docsync_core::errors::DocSyncResult;
use docsync_core::models::SyncCursor;

use super::{fmt_ts, parse_ts};
use crate::to_storage_err;

const TABLE: &str = "sync_cursors";

/// Move the cursor to `max(current, to)`; it never goes backwards.
pub fn advance_cursor(
    conn: &Connection,
    scope_id: &str,
    to: DateTime<Utc>,
    now: DateTime<Utc>,
) -> DocSyncResult<SyncCursor> {
    conn.execute(
        "INSERT INTO sync_cursors (scope_id, since, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT (scope_id) DO UPDATE SET
            since = MAX(since, excluded.since),
            updated_at = excluded.updated_at",
        params![scope_id, fmt_ts(&to), fmt_ts(&now)],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    get_cursor(conn, scope_id)?
        .ok_or_else(|| to_storage_err(format!("cursor for {scope_id} missing after upsert")))
}

pub fn get_cursor(conn: &Connection, scope_id: &str) -> DocSyncResult<Option<SyncCursor>> {
    let since: Option<String> = conn
        .query_row(
            "SELECT since FROM sync_cursors WHERE scope_id = ?1",
            params![scope_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;

    since
        .map(|raw| {
            Ok(SyncCursor {
                scope_id: scope_id.to_string(),
                since: parse_ts(TABLE, &raw)?,
            })
        })
        .transpose()
}
