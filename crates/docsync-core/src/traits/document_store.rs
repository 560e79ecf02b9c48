use chrono::{DateTime, Utc};

use crate::errors::DocSyncResult;
use crate::models::{DocumentSnapshot, DocumentWrite, StoredDocument, SyncCursor};

/// Callback run inside the per-document transaction: sees the committed
/// snapshot, returns the write to perform (or `None` to leave it alone).
pub type DocumentDecision<'d, 'a> =
    dyn FnMut(Option<&DocumentSnapshot>) -> Option<DocumentWrite<'a>> + 'd;

/// Server-side persistence for committed documents and sync cursors.
pub trait IDocumentStore: Send + Sync {
    /// Read the snapshot for `external_id`, let `decide` pick a write, and
    /// perform it, all inside one transaction. Concurrent calls for the same
    /// document are serialized.
    fn commit_document<'a>(
        &self,
        scope_id: &str,
        external_id: &str,
        decide: &mut DocumentDecision<'_, 'a>,
    ) -> DocSyncResult<()>;

    fn get_snapshot(&self, scope_id: &str, external_id: &str)
        -> DocSyncResult<Option<DocumentSnapshot>>;

    fn get_document(&self, scope_id: &str, external_id: &str)
        -> DocSyncResult<Option<StoredDocument>>;

    /// Non-deleted documents ordered by `updated_at_source`.
    fn list_live_documents(&self, scope_id: &str, limit: usize)
        -> DocSyncResult<Vec<StoredDocument>>;

    /// Advance the scope's cursor to `max(current, to)`.
    fn advance_cursor(&self, scope_id: &str, to: DateTime<Utc>) -> DocSyncResult<SyncCursor>;

    fn get_cursor(&self, scope_id: &str) -> DocSyncResult<Option<SyncCursor>>;
}
