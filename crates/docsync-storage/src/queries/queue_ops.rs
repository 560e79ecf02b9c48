//! Pending operation queue.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use docsync_core::errors::DocSyncResult;
use docsync_core::models::{NewPendingOp, PendingOp, PendingOpKind, QueueKey};

use super::{fmt_ts, parse_ts};
use crate::{corrupt_row, to_storage_err};

const TABLE: &str = "pending_ops";

/// Insert or refresh one entry. An existing `(op, external_id, path)` keeps
/// its `seq` and only takes the new change token.
pub fn enqueue(conn: &Connection, op: &NewPendingOp, now: DateTime<Utc>) -> DocSyncResult<()> {
    conn.execute(
        "INSERT INTO pending_ops (op, external_id, path, last_seen_change_token, enqueued_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (op, external_id, path) DO UPDATE SET
            last_seen_change_token = excluded.last_seen_change_token",
        params![
            op.key.op.as_str(),
            op.key.external_id,
            op.key.path,
            op.change_token,
            fmt_ts(&now),
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Oldest-first.
pub fn list_pending(conn: &Connection, limit: usize) -> DocSyncResult<Vec<PendingOp>> {
    let mut stmt = conn
        .prepare(
            "SELECT seq, op, external_id, path, last_seen_change_token, enqueued_at
             FROM pending_ops ORDER BY seq ASC LIMIT ?1",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, String>(5)?,
            ))
        })
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;

    rows.into_iter()
        .map(|(seq, op, external_id, path, token, enqueued_at)| {
            let op = PendingOpKind::parse(&op)
                .ok_or_else(|| corrupt_row(TABLE, format!("unknown op '{op}' at seq {seq}")))?;
            Ok(PendingOp {
                seq,
                key: QueueKey {
                    op,
                    external_id,
                    path,
                },
                last_seen_change_token: token,
                enqueued_at: parse_ts(TABLE, &enqueued_at)?,
            })
        })
        .collect()
}

pub fn count_pending(conn: &Connection) -> DocSyncResult<usize> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM pending_ops", [], |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(count as usize)
}

/// Remove the entry only if it was not re-enqueued since `token` was read.
/// Returns whether a row was removed.
pub fn remove_if_token(conn: &Connection, key: &QueueKey, token: i64) -> DocSyncResult<bool> {
    let removed = conn
        .execute(
            "DELETE FROM pending_ops
             WHERE op = ?1 AND external_id = ?2 AND path = ?3 AND last_seen_change_token = ?4",
            params![key.op.as_str(), key.external_id, key.path, token],
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(removed > 0)
}
