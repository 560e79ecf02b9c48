//! Local change index.

use rusqlite::{params, Connection, OptionalExtension};

use docsync_core::errors::DocSyncResult;
use docsync_core::models::LocalIndexEntry;

use super::{fmt_ts, parse_ts};
use crate::to_storage_err;

const TABLE: &str = "local_index";

pub fn upsert_entry(conn: &Connection, entry: &LocalIndexEntry) -> DocSyncResult<()> {
    conn.execute(
        "INSERT INTO local_index (external_id, path, content_hash, last_synced_at, last_seen_change_token)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (external_id) DO UPDATE SET
            path = excluded.path,
            content_hash = excluded.content_hash,
            last_synced_at = excluded.last_synced_at,
            last_seen_change_token = excluded.last_seen_change_token",
        params![
            entry.external_id,
            entry.path,
            entry.content_hash,
            fmt_ts(&entry.last_synced_at),
            entry.last_seen_change_token,
        ],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

pub fn delete_entry(conn: &Connection, external_id: &str) -> DocSyncResult<()> {
    conn.execute(
        "DELETE FROM local_index WHERE external_id = ?1",
        params![external_id],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

/// Update the change token only. No-op when the entry does not exist.
pub fn refresh_token(conn: &Connection, external_id: &str, token: i64) -> DocSyncResult<()> {
    conn.execute(
        "UPDATE local_index SET last_seen_change_token = ?2 WHERE external_id = ?1",
        params![external_id, token],
    )
    .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(())
}

type RawEntry = (String, String, String, String, i64);

fn decode((external_id, path, content_hash, last_synced_at, token): RawEntry) -> DocSyncResult<LocalIndexEntry> {
    Ok(LocalIndexEntry {
        last_synced_at: parse_ts(TABLE, &last_synced_at)?,
        external_id,
        path,
        content_hash,
        last_seen_change_token: token,
    })
}

fn read_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEntry> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

pub fn get_entry(conn: &Connection, external_id: &str) -> DocSyncResult<Option<LocalIndexEntry>> {
    conn.query_row(
        "SELECT external_id, path, content_hash, last_synced_at, last_seen_change_token
         FROM local_index WHERE external_id = ?1",
        params![external_id],
        read_raw,
    )
    .optional()
    .map_err(|e| to_storage_err(e.to_string()))?
    .map(decode)
    .transpose()
}

pub fn list_entries(conn: &Connection) -> DocSyncResult<Vec<LocalIndexEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT external_id, path, content_hash, last_synced_at, last_seen_change_token
             FROM local_index ORDER BY path ASC",
        )
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map([], read_raw)
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.into_iter().map(decode).collect()
}

pub fn count_entries(conn: &Connection) -> DocSyncResult<usize> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM local_index", [], |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))?;
    Ok(count as usize)
}
