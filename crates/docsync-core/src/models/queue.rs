//! Agent-side durable state: pending operations and the local change index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a pending intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingOpKind {
    Upsert,
    Delete,
}

impl PendingOpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PendingOpKind::Upsert => "upsert",
            PendingOpKind::Delete => "delete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "upsert" => Some(PendingOpKind::Upsert),
            "delete" => Some(PendingOpKind::Delete),
            _ => None,
        }
    }
}

/// Queue identity. At most one pending entry exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueKey {
    pub op: PendingOpKind,
    pub external_id: String,
    pub path: String,
}

/// An intent to enqueue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPendingOp {
    pub key: QueueKey,
    /// Modification time (upsert) or observation time (delete), epoch ms.
    pub change_token: i64,
}

/// A queued intent awaiting transmission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOp {
    /// Insertion order; re-enqueueing a key keeps its original position.
    pub seq: i64,
    pub key: QueueKey,
    pub last_seen_change_token: i64,
    pub enqueued_at: DateTime<Utc>,
}

/// What the agent last confirmed the server persisted for a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalIndexEntry {
    pub external_id: String,
    pub path: String,
    pub content_hash: String,
    pub last_synced_at: DateTime<Utc>,
    pub last_seen_change_token: i64,
}

/// Index mutation that accompanies a queue acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexUpdate {
    /// Upsert acknowledged: record the delivered content.
    Record(LocalIndexEntry),
    /// Delete acknowledged: forget the document.
    Forget { external_id: String },
    /// Content unchanged locally: refresh the change token only.
    RefreshToken { external_id: String, token: i64 },
    /// Leave the index alone.
    Keep,
}

/// Remove a queue entry (if still at `token`) and apply an index update in
/// the same durable transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueAck {
    pub key: QueueKey,
    pub token: i64,
    pub index: IndexUpdate,
}

impl QueueKey {
    pub fn upsert(external_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            op: PendingOpKind::Upsert,
            external_id: external_id.into(),
            path: path.into(),
        }
    }

    pub fn delete(external_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            op: PendingOpKind::Delete,
            external_id: external_id.into(),
            path: path.into(),
        }
    }
}
