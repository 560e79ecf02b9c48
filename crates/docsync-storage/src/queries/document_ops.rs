//! Committed documents: snapshot reads, resolved writes, downstream listing.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

use docsync_core::errors::DocSyncResult;
use docsync_core::models::{DocumentSnapshot, DocumentWrite, Metadata, StoredDocument};
use docsync_core::traits::DocumentDecision;

use super::{fmt_ts, parse_opt_ts, parse_ts};
use crate::{corrupt_row, to_storage_err};

const TABLE: &str = "documents";

pub fn get_snapshot(
    conn: &Connection,
    scope_id: &str,
    external_id: &str,
) -> DocSyncResult<Option<DocumentSnapshot>> {
    let row = conn
        .query_row(
            "SELECT content_hash, updated_at_source, deleted_at_source
             FROM documents WHERE scope_id = ?1 AND external_id = ?2",
            params![scope_id, external_id],
            |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            },
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;

    let Some((content_hash, updated, deleted)) = row else {
        return Ok(None);
    };
    Ok(Some(DocumentSnapshot {
        external_id: external_id.to_string(),
        content_hash,
        updated_at_source: parse_opt_ts(TABLE, updated)?,
        deleted_at_source: parse_opt_ts(TABLE, deleted)?,
    }))
}

const DOCUMENT_COLUMNS: &str = "scope_id, external_id, title, content_markdown, content_hash,
     updated_at_source, deleted_at_source, metadata, synced_at";

struct RawDocument {
    scope_id: String,
    external_id: String,
    title: Option<String>,
    content_markdown: Option<String>,
    content_hash: Option<String>,
    updated_at_source: Option<String>,
    deleted_at_source: Option<String>,
    metadata: String,
    synced_at: String,
}

fn read_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawDocument> {
    Ok(RawDocument {
        scope_id: row.get(0)?,
        external_id: row.get(1)?,
        title: row.get(2)?,
        content_markdown: row.get(3)?,
        content_hash: row.get(4)?,
        updated_at_source: row.get(5)?,
        deleted_at_source: row.get(6)?,
        metadata: row.get(7)?,
        synced_at: row.get(8)?,
    })
}

fn decode(raw: RawDocument) -> DocSyncResult<StoredDocument> {
    let metadata: Metadata = serde_json::from_str(&raw.metadata)
        .map_err(|e| corrupt_row(TABLE, format!("parse metadata of {}: {e}", raw.external_id)))?;
    Ok(StoredDocument {
        updated_at_source: parse_opt_ts(TABLE, raw.updated_at_source)?,
        deleted_at_source: parse_opt_ts(TABLE, raw.deleted_at_source)?,
        synced_at: parse_ts(TABLE, &raw.synced_at)?,
        scope_id: raw.scope_id,
        external_id: raw.external_id,
        title: raw.title,
        content_markdown: raw.content_markdown,
        content_hash: raw.content_hash,
        metadata,
    })
}

pub fn get_document(
    conn: &Connection,
    scope_id: &str,
    external_id: &str,
) -> DocSyncResult<Option<StoredDocument>> {
    let raw = conn
        .query_row(
            &format!(
                "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE scope_id = ?1 AND external_id = ?2"
            ),
            params![scope_id, external_id],
            read_raw,
        )
        .optional()
        .map_err(|e| to_storage_err(e.to_string()))?;
    raw.map(decode).transpose()
}

/// Live (non-deleted) documents, oldest source edit first.
pub fn list_live_documents(
    conn: &Connection,
    scope_id: &str,
    limit: usize,
) -> DocSyncResult<Vec<StoredDocument>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents
             WHERE scope_id = ?1 AND deleted_at_source IS NULL
             ORDER BY updated_at_source ASC, synced_at ASC, external_id ASC
             LIMIT ?2"
        ))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![scope_id, limit as i64], read_raw)
        .map_err(|e| to_storage_err(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| to_storage_err(e.to_string()))?;
    rows.into_iter().map(decode).collect()
}

/// Perform a resolved write. Callers hold the per-document transaction.
pub fn apply_write(
    conn: &Connection,
    scope_id: &str,
    external_id: &str,
    write: &DocumentWrite<'_>,
    synced_at: DateTime<Utc>,
) -> DocSyncResult<()> {
    match write {
        DocumentWrite::Upsert { item, updated_at } => {
            let metadata = serde_json::to_string(&item.metadata)?;
            conn.execute(
                "INSERT INTO documents (
                    scope_id, external_id, title, content_markdown, content_hash,
                    updated_at_source, deleted_at_source, metadata, synced_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7, ?8)
                 ON CONFLICT (scope_id, external_id) DO UPDATE SET
                    title = excluded.title,
                    content_markdown = excluded.content_markdown,
                    content_hash = excluded.content_hash,
                    updated_at_source = excluded.updated_at_source,
                    deleted_at_source = NULL,
                    metadata = excluded.metadata,
                    synced_at = excluded.synced_at",
                params![
                    scope_id,
                    external_id,
                    item.title,
                    item.content_markdown,
                    item.content_hash,
                    fmt_ts(updated_at),
                    metadata,
                    fmt_ts(&synced_at),
                ],
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
        }
        DocumentWrite::Tombstone {
            deleted_at,
            metadata,
        } => {
            let metadata = serde_json::to_string(metadata)?;
            conn.execute(
                "INSERT INTO documents (
                    scope_id, external_id, title, content_markdown, content_hash,
                    updated_at_source, deleted_at_source, metadata, synced_at
                 ) VALUES (?1, ?2, NULL, NULL, NULL, NULL, ?3, ?4, ?5)
                 ON CONFLICT (scope_id, external_id) DO UPDATE SET
                    title = NULL,
                    content_markdown = NULL,
                    content_hash = NULL,
                    updated_at_source = NULL,
                    deleted_at_source = excluded.deleted_at_source,
                    metadata = excluded.metadata,
                    synced_at = excluded.synced_at",
                params![
                    scope_id,
                    external_id,
                    fmt_ts(deleted_at),
                    metadata,
                    fmt_ts(&synced_at),
                ],
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
        }
        DocumentWrite::Touch {
            updated_at,
            title,
            metadata,
        } => {
            let metadata = serde_json::to_string(metadata)?;
            conn.execute(
                "UPDATE documents SET updated_at_source = ?3, title = ?4, metadata = ?5
                 WHERE scope_id = ?1 AND external_id = ?2",
                params![scope_id, external_id, fmt_ts(updated_at), title, metadata],
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
        }
    }
    Ok(())
}

/// Read the snapshot, let `decide` choose, write, all in one IMMEDIATE
/// transaction so no other writer can interleave between read and write.
pub fn commit_document<'a>(
    conn: &Connection,
    scope_id: &str,
    external_id: &str,
    decide: &mut DocumentDecision<'_, 'a>,
    synced_at: DateTime<Utc>,
) -> DocSyncResult<()> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(|e| to_storage_err(format!("commit_document begin: {e}")))?;

    match commit_document_inner(&tx, scope_id, external_id, decide, synced_at) {
        Ok(()) => {
            tx.commit()
                .map_err(|e| to_storage_err(format!("commit_document commit: {e}")))?;
            Ok(())
        }
        Err(e) => {
            let _ = tx.rollback();
            Err(e)
        }
    }
}

fn commit_document_inner<'a>(
    conn: &Connection,
    scope_id: &str,
    external_id: &str,
    decide: &mut DocumentDecision<'_, 'a>,
    synced_at: DateTime<Utc>,
) -> DocSyncResult<()> {
    let snapshot = get_snapshot(conn, scope_id, external_id)?;
    if let Some(write) = decide(snapshot.as_ref()) {
        apply_write(conn, scope_id, external_id, &write, synced_at)?;
    }
    Ok(())
}
