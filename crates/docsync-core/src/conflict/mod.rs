//! Conflict resolution: last-writer-wins per document keyed by source
//! timestamp, with tombstones.
//!
//! Pure functions, no I/O. Given the committed snapshot (if any), an incoming
//! item, and the server receipt time, decide whether to apply the item.
//!
//! Tie-breaks at equal timestamps:
//! - an upsert never overrides an existing tombstone (deletes win ties);
//! - a delete never re-applies over existing state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::protocol::reasons;
use crate::models::{DeleteItem, DocumentSnapshot, SyncItem, UpsertItem};

/// Why a resolver decided not to apply an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The committed state is newer (or an equal-time tombstone).
    StaleSourceTimestamp,
    /// The committed content already has this hash.
    Unchanged,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::StaleSourceTimestamp => reasons::STALE_SOURCE_TIMESTAMP,
            SkipReason::Unchanged => reasons::UNCHANGED,
        }
    }
}

/// The resolver's decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Write the item. `tombstone` is set when a delete arrives for a
    /// document that was never seen, so a late older upsert stays stale.
    Apply { tombstone: bool },
    /// No state change.
    Skip(SkipReason),
    /// Content is identical but the source timestamp moved forward. Reported
    /// as `unchanged`; only the stored timestamp advances so later stale
    /// items are still recognized as stale regardless of arrival order.
    Touch { updated_at: DateTime<Utc> },
}

impl Resolution {
    pub fn is_apply(&self) -> bool {
        matches!(self, Resolution::Apply { .. })
    }

    /// The reason reported to the client, if this is not an apply.
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Resolution::Apply { .. } => None,
            Resolution::Skip(reason) => Some(*reason),
            Resolution::Touch { .. } => Some(SkipReason::Unchanged),
        }
    }
}

/// Effective source time of an upsert: its own timestamp, else receipt time.
pub fn upsert_effective_at(incoming: &UpsertItem, received_at: DateTime<Utc>) -> DateTime<Utc> {
    incoming.updated_at_source.unwrap_or(received_at)
}

/// Decide an upsert.
pub fn resolve_upsert(
    existing: Option<&DocumentSnapshot>,
    incoming: &UpsertItem,
    received_at: DateTime<Utc>,
) -> Resolution {
    let Some(existing) = existing else {
        return Resolution::Apply { tombstone: false };
    };
    let incoming_at = upsert_effective_at(incoming, received_at);
    let Some(existing_at) = existing.effective_timestamp() else {
        return Resolution::Apply { tombstone: false };
    };

    if incoming_at < existing_at {
        return Resolution::Skip(SkipReason::StaleSourceTimestamp);
    }
    if existing.is_tombstone() {
        if incoming_at == existing_at {
            return Resolution::Skip(SkipReason::StaleSourceTimestamp);
        }
        return Resolution::Apply { tombstone: false };
    }
    if existing.content_hash.as_deref() == Some(incoming.content_hash.as_str()) {
        if incoming_at == existing_at {
            return Resolution::Skip(SkipReason::Unchanged);
        }
        return Resolution::Touch {
            updated_at: incoming_at,
        };
    }
    Resolution::Apply { tombstone: false }
}

/// Decide a delete.
pub fn resolve_delete(
    existing: Option<&DocumentSnapshot>,
    incoming: &DeleteItem,
    _received_at: DateTime<Utc>,
) -> Resolution {
    let Some(existing) = existing else {
        return Resolution::Apply { tombstone: true };
    };
    let incoming_at = incoming.deleted_at_source;
    match existing.effective_timestamp() {
        Some(existing_at) if incoming_at <= existing_at => {
            Resolution::Skip(SkipReason::StaleSourceTimestamp)
        }
        _ => Resolution::Apply { tombstone: false },
    }
}

/// Dispatch on the item kind.
pub fn resolve(
    existing: Option<&DocumentSnapshot>,
    incoming: &SyncItem,
    received_at: DateTime<Utc>,
) -> Resolution {
    match incoming {
        SyncItem::Upsert(item) => resolve_upsert(existing, item, received_at),
        SyncItem::Delete(item) => resolve_delete(existing, item, received_at),
    }
}
