//! The single `agent_status` row.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use docsync_core::errors::DocSyncResult;
use docsync_core::models::{ErrorClass, SyncStatusReport};

use super::{fmt_ts, parse_opt_ts};
use crate::{corrupt_row, to_storage_err};

const TABLE: &str = "agent_status";

/// A successful delivery clears the last error and any auth pause.
pub fn record_success(conn: &Connection, at: DateTime<Utc>) -> DocSyncResult<()> {
    conn.execute(
        "UPDATE agent_status SET
            last_successful_sync_at = ?1,
            last_error_class = NULL,
            last_error_message = NULL,
            last_error_at = NULL,
            auth_required = 0
         WHERE id = 1",
        params![fmt_ts(&at)],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn record_error(
    conn: &Connection,
    class: ErrorClass,
    message: &str,
    at: DateTime<Utc>,
) -> DocSyncResult<()> {
    conn.execute(
        "UPDATE agent_status SET
            last_error_class = ?1,
            last_error_message = ?2,
            last_error_at = ?3
         WHERE id = 1",
        params![class.as_str(), message, fmt_ts(&at)],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn set_auth_required(conn: &Connection, required: bool) -> DocSyncResult<()> {
    conn.execute(
        "UPDATE agent_status SET auth_required = ?1 WHERE id = 1",
        params![required as i32],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// The status row; queue and index counts are filled in by the caller.
pub fn read_status(conn: &Connection) -> DocSyncResult<SyncStatusReport> {
    let (last_success, class, message, error_at, auth_required) = conn
        .query_row(
            "SELECT last_successful_sync_at, last_error_class, last_error_message,
                    last_error_at, auth_required
             FROM agent_status WHERE id = 1",
            [],
            |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, i32>(4)?,
                ))
            },
        )
        .map_err(|e| to_storage_err(e.to_string()))?;

    let last_error_class = class
        .map(|raw| {
            ErrorClass::parse(&raw)
                .ok_or_else(|| corrupt_row(TABLE, format!("unknown error class '{raw}'")))
        })
        .transpose()?;

    Ok(SyncStatusReport {
        last_successful_sync_at: parse_opt_ts(TABLE, last_success)?,
        pending_queue_depth: 0,
        indexed_documents: 0,
        last_error_class,
        last_error_message: message,
        last_error_at: parse_opt_ts(TABLE, error_at)?,
        auth_required: auth_required != 0,
    })
}
