//! Ingestion pipeline: parse, validate, resolve and persist each item of a
//! batch independently.
//!
//! A bad item never fails its batch. Only a failure to advance the scope
//! cursor, which means storage is unreachable, surfaces as an error.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use docsync_core::conflict::{resolve, upsert_effective_at, Resolution};
use docsync_core::errors::DocSyncResult;
use docsync_core::models::protocol::reasons;
use docsync_core::models::{BatchResponse, DocumentWrite, ItemResult, SyncItem};
use docsync_core::traits::IDocumentStore;

pub struct IngestionPipeline {
    store: Arc<dyn IDocumentStore>,
}

impl IngestionPipeline {
    pub fn new(store: Arc<dyn IDocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn IDocumentStore> {
        &self.store
    }

    /// Process raw items in order and report one result per item, in the
    /// same order. Each item commits in its own transaction.
    pub fn ingest(
        &self,
        scope_id: &str,
        items: Vec<Value>,
        received_at: DateTime<Utc>,
    ) -> DocSyncResult<BatchResponse> {
        let mut response = BatchResponse::default();
        for raw in items {
            response.push(self.ingest_item(scope_id, raw, received_at));
        }
        self.store.advance_cursor(scope_id, received_at)?;

        tracing::info!(
            scope = %scope_id,
            accepted = response.accepted,
            skipped = response.skipped,
            rejected = response.rejected,
            "batch ingested"
        );
        Ok(response)
    }

    fn ingest_item(&self, scope_id: &str, raw: Value, received_at: DateTime<Utc>) -> ItemResult {
        let claimed_id = raw
            .get("externalId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let item: SyncItem = match serde_json::from_value(raw) {
            Ok(item) => item,
            Err(e) => {
                tracing::debug!(external_id = %claimed_id, error = %e, "malformed item");
                return ItemResult::rejected(claimed_id, reasons::INVALID_ITEM);
            }
        };
        if let Err(reason) = item.validate() {
            tracing::debug!(external_id = %claimed_id, reason = %reason, "invalid item");
            return ItemResult::rejected(claimed_id, reasons::INVALID_ITEM);
        }

        let external_id = item.external_id();
        let mut resolution = None;
        let committed = self
            .store
            .commit_document(scope_id, external_id, &mut |existing| {
                let decided = resolve(existing, &item, received_at);
                resolution = Some(decided);
                write_for(&item, decided, received_at)
            });

        match (committed, resolution) {
            (Ok(()), Some(decided)) => match decided.skip_reason() {
                None => ItemResult::accepted(external_id),
                Some(reason) => {
                    tracing::debug!(external_id = %external_id, reason = reason.as_str(), "item skipped");
                    ItemResult::skipped(external_id, reason.as_str())
                }
            },
            (Ok(()), None) => ItemResult::rejected(external_id, reasons::SERVER_ERROR),
            (Err(e), _) => {
                tracing::warn!(scope = %scope_id, external_id = %external_id, error = %e, "item commit failed");
                ItemResult::rejected(external_id, reasons::SERVER_ERROR)
            }
        }
    }
}

/// The write a resolution turns into, if any.
fn write_for(item: &SyncItem, resolution: Resolution, received_at: DateTime<Utc>) -> Option<DocumentWrite<'_>> {
    match (resolution, item) {
        (Resolution::Skip(_), _) => None,
        (Resolution::Touch { updated_at }, SyncItem::Upsert(upsert)) => Some(DocumentWrite::Touch {
            updated_at,
            title: upsert.title.as_deref(),
            metadata: &upsert.metadata,
        }),
        (Resolution::Touch { .. }, SyncItem::Delete(_)) => None,
        (Resolution::Apply { .. }, SyncItem::Upsert(upsert)) => Some(DocumentWrite::Upsert {
            item: upsert,
            updated_at: upsert_effective_at(upsert, received_at),
        }),
        (Resolution::Apply { .. }, SyncItem::Delete(delete)) => Some(DocumentWrite::Tombstone {
            deleted_at: delete.deleted_at_source,
            metadata: &delete.metadata,
        }),
    }
}
