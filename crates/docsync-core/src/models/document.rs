//! Server-side document state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::sync_item::{Metadata, UpsertItem};

/// The authoritative per-document state the conflict resolver decides
/// against. A tombstone has `deleted_at_source` set and no content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub external_id: String,
    pub content_hash: Option<String>,
    pub updated_at_source: Option<DateTime<Utc>>,
    pub deleted_at_source: Option<DateTime<Utc>>,
}

impl DocumentSnapshot {
    pub fn is_tombstone(&self) -> bool {
        self.deleted_at_source.is_some()
    }

    /// Latest of the update and delete timestamps, if either is set.
    pub fn effective_timestamp(&self) -> Option<DateTime<Utc>> {
        match (self.updated_at_source, self.deleted_at_source) {
            (Some(u), Some(d)) => Some(u.max(d)),
            (u, d) => u.or(d),
        }
    }
}

/// A full committed document row, as read by downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub scope_id: String,
    pub external_id: String,
    pub title: Option<String>,
    pub content_markdown: Option<String>,
    pub content_hash: Option<String>,
    pub updated_at_source: Option<DateTime<Utc>>,
    pub deleted_at_source: Option<DateTime<Utc>>,
    pub metadata: Metadata,
    pub synced_at: DateTime<Utc>,
}

impl StoredDocument {
    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            external_id: self.external_id.clone(),
            content_hash: self.content_hash.clone(),
            updated_at_source: self.updated_at_source,
            deleted_at_source: self.deleted_at_source,
        }
    }
}

/// The write a resolved item turns into. Executed atomically with the
/// snapshot read that produced it.
#[derive(Debug, Clone)]
pub enum DocumentWrite<'a> {
    /// Replace content; clears any tombstone.
    Upsert {
        item: &'a UpsertItem,
        updated_at: DateTime<Utc>,
    },
    /// Record deletion; clears content, hash, title and update time.
    Tombstone {
        deleted_at: DateTime<Utc>,
        metadata: &'a Metadata,
    },
    /// Same content at a newer time: advance `updated_at_source` and take
    /// the newer title and metadata, leaving content alone.
    Touch {
        updated_at: DateTime<Utc>,
        title: Option<&'a str>,
        metadata: &'a Metadata,
    },
}

/// How far a connection's source has been observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCursor {
    pub scope_id: String,
    pub since: DateTime<Utc>,
}
