//! Schema migrations tracked with `PRAGMA user_version`.

pub mod v001_documents;
pub mod v002_agent_queue;
pub mod v003_agent_status;

use rusqlite::Connection;

use docsync_core::errors::{DocSyncError, DocSyncResult, StorageError};

use crate::to_storage_err;

/// Ordered `(version, sql)` pairs. Append only.
const MIGRATIONS: &[(u32, &str)] = &[
    (1, v001_documents::MIGRATION_SQL),
    (2, v002_agent_queue::MIGRATION_SQL),
    (3, v003_agent_status::MIGRATION_SQL),
];

pub const LATEST_VERSION: u32 = 3;

pub fn current_version(conn: &Connection) -> DocSyncResult<u32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| to_storage_err(e.to_string()))
}

/// Apply every migration newer than the stored `user_version`, each in its
/// own transaction. Returns the number applied.
pub fn run_migrations(conn: &Connection) -> DocSyncResult<usize> {
    let current = current_version(conn)?;
    let mut applied = 0;

    for &(version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
        let failed = |reason: String| {
            DocSyncError::StorageError(StorageError::MigrationFailed { version, reason })
        };
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| failed(e.to_string()))?;
        tx.execute_batch(sql).map_err(|e| failed(e.to_string()))?;
        tx.pragma_update(None, "user_version", version)
            .map_err(|e| failed(e.to_string()))?;
        tx.commit().map_err(|e| failed(e.to_string()))?;

        tracing::info!(version, "applied migration");
        applied += 1;
    }

    Ok(applied)
}
