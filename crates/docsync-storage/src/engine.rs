//! StorageEngine: owns the ConnectionPool, implements IDocumentStore and
//! IAgentStateStore.

use std::path::Path;

use chrono::{DateTime, Utc};

use docsync_core::config::StorageConfig;
use docsync_core::errors::DocSyncResult;
use docsync_core::models::{
    DocumentSnapshot, ErrorClass, IndexUpdate, LocalIndexEntry, NewPendingOp, PendingOp,
    QueueAck, StoredDocument, SyncCursor, SyncStatusReport,
};
use docsync_core::traits::{DocumentDecision, IAgentStateStore, IDocumentStore};

use crate::pool::ConnectionPool;
use crate::queries::{cursor_ops, document_ops, index_ops, queue_ops, status_ops};
use crate::to_storage_err;

/// The storage engine shared by the agent and the server.
pub struct StorageEngine {
    pool: ConnectionPool,
}

impl StorageEngine {
    /// Open a file-backed engine with default pool settings.
    pub fn open(path: &Path) -> DocSyncResult<Self> {
        Self::open_with_config(path, &StorageConfig::default())
    }

    pub fn open_with_config(path: &Path, config: &StorageConfig) -> DocSyncResult<Self> {
        let pool = ConnectionPool::open(path, config)?;
        tracing::debug!(path = %path.display(), "storage engine opened");
        Ok(Self { pool })
    }

    /// In-memory engine. All reads go through the writer.
    pub fn open_in_memory() -> DocSyncResult<Self> {
        Ok(Self {
            pool: ConnectionPool::open_in_memory()?,
        })
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// File-backed: read pool. In-memory: the writer.
    fn with_reader<F, T>(&self, f: F) -> DocSyncResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> DocSyncResult<T>,
    {
        match &self.pool.readers {
            Some(readers) => readers.with_conn(f),
            None => self.pool.writer.with_conn_sync(f),
        }
    }

    /// Run `f` inside one write transaction.
    fn with_write_tx<F, T>(&self, label: &str, f: F) -> DocSyncResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> DocSyncResult<T>,
    {
        self.pool.writer.with_conn_sync(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| to_storage_err(format!("{label} begin: {e}")))?;
            match f(&tx) {
                Ok(value) => {
                    tx.commit()
                        .map_err(|e| to_storage_err(format!("{label} commit: {e}")))?;
                    Ok(value)
                }
                Err(e) => {
                    let _ = tx.rollback();
                    Err(e)
                }
            }
        })
    }
}

impl IDocumentStore for StorageEngine {
    fn commit_document<'a>(
        &self,
        scope_id: &str,
        external_id: &str,
        decide: &mut DocumentDecision<'_, 'a>,
    ) -> DocSyncResult<()> {
        self.pool.writer.with_conn_sync(|conn| {
            document_ops::commit_document(conn, scope_id, external_id, decide, Utc::now())
        })
    }

    fn get_snapshot(
        &self,
        scope_id: &str,
        external_id: &str,
    ) -> DocSyncResult<Option<DocumentSnapshot>> {
        self.with_reader(|conn| document_ops::get_snapshot(conn, scope_id, external_id))
    }

    fn get_document(
        &self,
        scope_id: &str,
        external_id: &str,
    ) -> DocSyncResult<Option<StoredDocument>> {
        self.with_reader(|conn| document_ops::get_document(conn, scope_id, external_id))
    }

    fn list_live_documents(
        &self,
        scope_id: &str,
        limit: usize,
    ) -> DocSyncResult<Vec<StoredDocument>> {
        self.with_reader(|conn| document_ops::list_live_documents(conn, scope_id, limit))
    }

    fn advance_cursor(&self, scope_id: &str, to: DateTime<Utc>) -> DocSyncResult<SyncCursor> {
        self.pool
            .writer
            .with_conn_sync(|conn| cursor_ops::advance_cursor(conn, scope_id, to, Utc::now()))
    }

    fn get_cursor(&self, scope_id: &str) -> DocSyncResult<Option<SyncCursor>> {
        self.with_reader(|conn| cursor_ops::get_cursor(conn, scope_id))
    }
}

impl IAgentStateStore for StorageEngine {
    fn enqueue(&self, ops: &[NewPendingOp]) -> DocSyncResult<()> {
        if ops.is_empty() {
            return Ok(());
        }
        let now = Utc::now();
        self.with_write_tx("enqueue", |conn| {
            for op in ops {
                queue_ops::enqueue(conn, op, now)?;
            }
            Ok(())
        })
    }

    fn pending_ops(&self, limit: usize) -> DocSyncResult<Vec<PendingOp>> {
        self.with_reader(|conn| queue_ops::list_pending(conn, limit))
    }

    fn pending_count(&self) -> DocSyncResult<usize> {
        self.with_reader(queue_ops::count_pending)
    }

    fn acknowledge(&self, acks: &[QueueAck]) -> DocSyncResult<usize> {
        if acks.is_empty() {
            return Ok(0);
        }
        self.with_write_tx("acknowledge", |conn| {
            let mut removed = 0;
            for ack in acks {
                if queue_ops::remove_if_token(conn, &ack.key, ack.token)? {
                    removed += 1;
                }
                // The index records what the server holds, which is true
                // whether or not the entry was re-enqueued meanwhile.
                match &ack.index {
                    IndexUpdate::Record(entry) => index_ops::upsert_entry(conn, entry)?,
                    IndexUpdate::Forget { external_id } => {
                        index_ops::delete_entry(conn, external_id)?
                    }
                    IndexUpdate::RefreshToken { external_id, token } => {
                        index_ops::refresh_token(conn, external_id, *token)?
                    }
                    IndexUpdate::Keep => {}
                }
            }
            Ok(removed)
        })
    }

    fn index_entry(&self, external_id: &str) -> DocSyncResult<Option<LocalIndexEntry>> {
        self.with_reader(|conn| index_ops::get_entry(conn, external_id))
    }

    fn index_entries(&self) -> DocSyncResult<Vec<LocalIndexEntry>> {
        self.with_reader(index_ops::list_entries)
    }

    fn record_success(&self, at: DateTime<Utc>) -> DocSyncResult<()> {
        self.pool
            .writer
            .with_conn_sync(|conn| status_ops::record_success(conn, at))
    }

    fn record_error(
        &self,
        class: ErrorClass,
        message: &str,
        at: DateTime<Utc>,
    ) -> DocSyncResult<()> {
        self.pool
            .writer
            .with_conn_sync(|conn| status_ops::record_error(conn, class, message, at))
    }

    fn set_auth_required(&self, required: bool) -> DocSyncResult<()> {
        self.pool
            .writer
            .with_conn_sync(|conn| status_ops::set_auth_required(conn, required))
    }

    fn status(&self) -> DocSyncResult<SyncStatusReport> {
        self.with_reader(|conn| {
            let mut report = status_ops::read_status(conn)?;
            report.pending_queue_depth = queue_ops::count_pending(conn)?;
            report.indexed_documents = index_ops::count_entries(conn)?;
            Ok(report)
        })
    }
}
