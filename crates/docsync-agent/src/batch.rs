//! Batch builder: turns queue entries into wire items under item and byte
//! caps.
//!
//! The built batch is a read-only snapshot. Events arriving while it is in
//! flight only touch the durable queue.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use docsync_core::content_hash;
use docsync_core::errors::DocSyncResult;
use docsync_core::models::{
    DeleteItem, IndexUpdate, LocalIndexEntry, Metadata, PendingOp, PendingOpKind, QueueKey,
    SyncItem, UpsertItem,
};
use docsync_core::traits::IAgentStateStore;

use crate::settings::{AgentSettings, BatchLimits};
use crate::source::{millis_to_datetime, DocumentSource};
use crate::tracker::now_millis;

/// One item in the batch and how to acknowledge it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub key: QueueKey,
    /// Queue token captured at build time; the ack only removes the entry
    /// if it is unchanged.
    pub token: i64,
    /// Index mutation to apply once the server confirms the item.
    pub on_success: IndexUpdate,
}

/// A dedup-dropped upsert: content matches what the server already has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnchangedEntry {
    pub key: QueueKey,
    pub token: i64,
    pub fresh_token: i64,
}

#[derive(Debug, Default)]
pub struct BuiltBatch {
    /// Wire items, parallel to `entries`.
    pub items: Vec<SyncItem>,
    pub entries: Vec<BatchEntry>,
    /// Removed from the queue without being sent.
    pub skipped: Vec<(QueueKey, i64)>,
    pub unchanged: Vec<UnchangedEntry>,
    /// Left queued because the document could not be read.
    pub deferred: usize,
    /// Serialized size of `items`.
    pub bytes: usize,
}

impl BuiltBatch {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub struct BatchBuilder<'a> {
    store: &'a dyn IAgentStateStore,
    source: &'a dyn DocumentSource,
    settings: &'a AgentSettings,
}

fn path_metadata(path: &str) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("path".to_string(), Value::String(path.to_string()));
    metadata
}

enum Materialized {
    Item(SyncItem, IndexUpdate),
    Skipped,
    Unchanged { fresh_token: i64 },
    Deferred,
}

impl<'a> BatchBuilder<'a> {
    pub fn new(
        store: &'a dyn IAgentStateStore,
        source: &'a dyn DocumentSource,
        settings: &'a AgentSettings,
    ) -> Self {
        Self {
            store,
            source,
            settings,
        }
    }

    /// Build from `pending` (oldest first). At most `limits.max_items`
    /// entries are considered. Items are added while the running serialized
    /// size stays within `limits.max_bytes`; the first item that would
    /// overflow a non-empty batch stops the build and stays queued with
    /// everything after it. A single item larger than the budget is sent on
    /// its own so it cannot block the queue.
    ///
    /// An upsert that follows a delete of the same document in this batch is
    /// always sent, stamped after the delete.
    pub fn build(&self, pending: &[PendingOp], limits: BatchLimits) -> DocSyncResult<BuiltBatch> {
        let mut batch = BuiltBatch::default();
        let mut deleted: HashMap<String, DateTime<Utc>> = HashMap::new();

        for op in pending.iter().take(limits.max_items) {
            let after_delete = deleted.get(&op.key.external_id).copied();
            match self.materialize(op, after_delete)? {
                Materialized::Item(item, on_success) => {
                    let size = serde_json::to_vec(&item)?.len();
                    if !batch.items.is_empty() && batch.bytes + size > limits.max_bytes {
                        break;
                    }
                    if size > limits.max_bytes {
                        tracing::warn!(
                            external_id = %op.key.external_id,
                            size,
                            max_bytes = limits.max_bytes,
                            "item exceeds batch byte budget, sending alone"
                        );
                    }
                    batch.bytes += size;
                    if let SyncItem::Delete(delete) = &item {
                        deleted.insert(delete.external_id.clone(), delete.deleted_at_source);
                    }
                    batch.items.push(item);
                    batch.entries.push(BatchEntry {
                        key: op.key.clone(),
                        token: op.last_seen_change_token,
                        on_success,
                    });
                }
                Materialized::Skipped => {
                    batch.skipped.push((op.key.clone(), op.last_seen_change_token));
                }
                Materialized::Unchanged { fresh_token } => {
                    batch.unchanged.push(UnchangedEntry {
                        key: op.key.clone(),
                        token: op.last_seen_change_token,
                        fresh_token,
                    });
                }
                Materialized::Deferred => batch.deferred += 1,
            }
        }

        Ok(batch)
    }

    fn materialize(
        &self,
        op: &PendingOp,
        after_delete: Option<DateTime<Utc>>,
    ) -> DocSyncResult<Materialized> {
        match op.key.op {
            PendingOpKind::Delete => Ok(self.delete_item(op, millis_to_datetime(op.last_seen_change_token))),
            PendingOpKind::Upsert => self.upsert_item(op, after_delete),
        }
    }

    fn delete_item(&self, op: &PendingOp, deleted_at: DateTime<Utc>) -> Materialized {
        let item = SyncItem::Delete(DeleteItem {
            external_id: op.key.external_id.clone(),
            deleted_at_source: deleted_at,
            updated_at_source: None,
            metadata: path_metadata(&op.key.path),
        });
        Materialized::Item(
            item,
            IndexUpdate::Forget {
                external_id: op.key.external_id.clone(),
            },
        )
    }

    /// `after_delete` is the time of a delete for the same document placed
    /// earlier in this batch. Its ack forgets the index entry, so the hash
    /// comparison does not apply.
    fn upsert_item(
        &self,
        op: &PendingOp,
        after_delete: Option<DateTime<Utc>>,
    ) -> DocSyncResult<Materialized> {
        if !self.settings.scope().is_included(&op.key.path) {
            tracing::debug!(path = %op.key.path, "out of scope at flush time, skipping");
            return Ok(Materialized::Skipped);
        }

        let doc = match self.source.read(&op.key.path) {
            Ok(Some(doc)) => doc,
            // Gone between enqueue and flush: it is a delete now.
            Ok(None) => return Ok(self.delete_item(op, millis_to_datetime(now_millis()))),
            Err(e) => {
                tracing::warn!(path = %op.key.path, error = %e, "read failed, leaving queued");
                return Ok(Materialized::Deferred);
            }
        };

        let hash = content_hash(&doc.content);
        let mut updated_at = doc.modified_at;
        match after_delete {
            // A rename back keeps the old mtime, which would lose to the delete.
            Some(deleted_at) => updated_at = updated_at.max(deleted_at + Duration::milliseconds(1)),
            None => {
                let indexed = self.store.index_entry(&op.key.external_id)?;
                if indexed.as_ref().is_some_and(|entry| entry.content_hash == hash) {
                    return Ok(Materialized::Unchanged {
                        fresh_token: doc.change_token,
                    });
                }
            }
        }

        let item = SyncItem::Upsert(UpsertItem {
            external_id: op.key.external_id.clone(),
            title: doc.title,
            content_markdown: doc.content,
            content_hash: hash.clone(),
            updated_at_source: Some(updated_at),
            metadata: path_metadata(&op.key.path),
        });
        let on_success = IndexUpdate::Record(LocalIndexEntry {
            external_id: op.key.external_id.clone(),
            path: op.key.path.clone(),
            content_hash: hash,
            // Replaced with the acknowledgement time.
            last_synced_at: Utc::now(),
            last_seen_change_token: doc.change_token,
        });
        Ok(Materialized::Item(item, on_success))
    }
}
