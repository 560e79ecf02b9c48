//! The wire unit of sync: an upsert or a delete of one document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-form metadata carried alongside an item.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// One sync intent, tagged by `op` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SyncItem {
    Upsert(UpsertItem),
    Delete(DeleteItem),
}

/// Create or replace a document's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertItem {
    pub external_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content_markdown: String,
    pub content_hash: String,
    /// Source edit time. When absent the server uses its receipt time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at_source: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Mark a document deleted at the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteItem {
    pub external_id: String,
    pub deleted_at_source: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at_source: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl SyncItem {
    pub fn external_id(&self) -> &str {
        match self {
            SyncItem::Upsert(item) => &item.external_id,
            SyncItem::Delete(item) => &item.external_id,
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, SyncItem::Delete(_))
    }

    /// Shape checks that serde cannot express. Returns the first problem.
    pub fn validate(&self) -> Result<(), String> {
        if self.external_id().trim().is_empty() {
            return Err("externalId must not be empty".to_string());
        }
        if let SyncItem::Upsert(item) = self {
            if item.content_hash.trim().is_empty() {
                return Err("contentHash must not be empty".to_string());
            }
        }
        Ok(())
    }
}
