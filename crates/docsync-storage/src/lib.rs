//! # docsync-storage
//!
//! SQLite persistence for the sync engine. One serialized write connection
//! plus a round-robin read pool, WAL mode, `PRAGMA user_version` migrations.
//!
//! The same schema backs both sides: the server uses the `documents` and
//! `sync_cursors` tables through [`IDocumentStore`], the agent uses
//! `pending_ops`, `local_index` and `agent_status` through
//! [`IAgentStateStore`].
//!
//! [`IDocumentStore`]: docsync_core::traits::IDocumentStore
//! [`IAgentStateStore`]: docsync_core::traits::IAgentStateStore

pub mod engine;
pub mod migrations;
pub mod pool;
pub mod queries;

pub use engine::StorageEngine;

use docsync_core::errors::{DocSyncError, StorageError};

/// Convert any SQLite-level failure into the storage error variant.
pub fn to_storage_err(message: String) -> DocSyncError {
    DocSyncError::StorageError(StorageError::SqliteError { message })
}

/// A row that exists but cannot be decoded.
pub(crate) fn corrupt_row(table: &str, details: String) -> DocSyncError {
    DocSyncError::StorageError(StorageError::CorruptRow {
        table: table.to_string(),
        details,
    })
}
