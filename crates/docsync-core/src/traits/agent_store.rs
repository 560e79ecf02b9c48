use chrono::{DateTime, Utc};

use crate::errors::DocSyncResult;
use crate::models::{
    ErrorClass, LocalIndexEntry, NewPendingOp, PendingOp, QueueAck, SyncStatusReport,
};

/// Agent-side durable state: the pending operation queue, the local change
/// index, and the status row. Every mutation is persisted before returning.
pub trait IAgentStateStore: Send + Sync {
    /// Enqueue intents in one transaction. Re-enqueueing an existing
    /// `(op, external_id, path)` refreshes its change token in place.
    fn enqueue(&self, ops: &[NewPendingOp]) -> DocSyncResult<()>;

    /// Oldest-first pending entries.
    fn pending_ops(&self, limit: usize) -> DocSyncResult<Vec<PendingOp>>;

    fn pending_count(&self) -> DocSyncResult<usize>;

    /// Apply acknowledgements in one transaction. A queue entry is removed
    /// only if its change token still matches the acknowledged one. Returns
    /// the number of entries removed.
    fn acknowledge(&self, acks: &[QueueAck]) -> DocSyncResult<usize>;

    fn index_entry(&self, external_id: &str) -> DocSyncResult<Option<LocalIndexEntry>>;

    fn index_entries(&self) -> DocSyncResult<Vec<LocalIndexEntry>>;

    fn record_success(&self, at: DateTime<Utc>) -> DocSyncResult<()>;

    fn record_error(&self, class: ErrorClass, message: &str, at: DateTime<Utc>)
        -> DocSyncResult<()>;

    fn set_auth_required(&self, required: bool) -> DocSyncResult<()>;

    fn status(&self) -> DocSyncResult<SyncStatusReport>;
}
