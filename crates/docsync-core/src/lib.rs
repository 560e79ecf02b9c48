//! # docsync-core
//!
//! Foundation crate for the document sync engine.
//! Defines the wire model, content hashing, external ids, scope filtering,
//! the conflict resolver, errors, config, and the storage traits.
//! The agent, storage, and server crates all depend on this.

pub mod config;
pub mod conflict;
pub mod content;
pub mod errors;
pub mod models;
pub mod scope;
pub mod tracing_setup;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use config::DocSyncConfig;
pub use conflict::{resolve, resolve_delete, resolve_upsert, Resolution, SkipReason};
pub use content::{build_external_id, content_hash, hash, normalize};
pub use errors::{DocSyncError, DocSyncResult};
pub use models::{DeleteItem, DocumentSnapshot, SyncItem, UpsertItem};
pub use scope::ScopeFilter;
