//! Versioned wire protocol between agent and ingestion server.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::sync_item::SyncItem;

/// Current protocol version, sent in the [`PROTOCOL_HEADER`] header.
pub const PROTOCOL_VERSION: &str = "1.0";

pub const PROTOCOL_HEADER: &str = "x-docsync-protocol";

/// Route that accepts sync batches.
pub const SYNC_BATCHES_PATH: &str = "/api/v1/sync/batches";

/// Request envelope. The server deserializes items as raw JSON
/// (`SyncRequest<serde_json::Value>`) so a malformed item is rejected alone
/// instead of failing the whole batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest<I = SyncItem> {
    pub source_scope_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    pub agent_id: String,
    pub sent_at: DateTime<Utc>,
    pub items: Vec<I>,
}

/// Outcome of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Applied to the committed document state.
    Accepted,
    /// Permanently or transiently refused; see the reason.
    Rejected,
    /// Correctly determined to be a no-op (stale or unchanged).
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult {
    pub external_id: String,
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Response body for a batch whose envelope was accepted. Individual items
/// may still be rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub accepted: usize,
    pub rejected: usize,
    #[serde(default)]
    pub skipped: usize,
    pub item_results: Vec<ItemResult>,
}

/// Error body for non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub error: String,
}

/// Reason strings used in [`ItemResult::reason`].
pub mod reasons {
    pub const INVALID_ITEM: &str = "invalid_item";
    pub const SERVER_ERROR: &str = "server_error";
    pub const STALE_SOURCE_TIMESTAMP: &str = "stale_source_timestamp";
    pub const UNCHANGED: &str = "unchanged";
}

impl ItemResult {
    pub fn accepted(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            status: ItemStatus::Accepted,
            reason: None,
        }
    }

    pub fn skipped(external_id: impl Into<String>, reason: &str) -> Self {
        Self {
            external_id: external_id.into(),
            status: ItemStatus::Skipped,
            reason: Some(reason.to_string()),
        }
    }

    pub fn rejected(external_id: impl Into<String>, reason: &str) -> Self {
        Self {
            external_id: external_id.into(),
            status: ItemStatus::Rejected,
            reason: Some(reason.to_string()),
        }
    }
}

impl BatchResponse {
    /// Append a result and bump the matching counter.
    pub fn push(&mut self, result: ItemResult) {
        match result.status {
            ItemStatus::Accepted => self.accepted += 1,
            ItemStatus::Rejected => self.rejected += 1,
            ItemStatus::Skipped => self.skipped += 1,
        }
        self.item_results.push(result);
    }
}
