//! Error handling for the sync engine.
//! One error enum per subsystem, `thiserror` only. `anyhow` stays in binaries.

pub mod config_error;
pub mod docsync_error;
pub mod error_code;
pub mod ingest_error;
pub mod source_error;
pub mod storage_error;
pub mod transport_error;

pub use config_error::ConfigError;
pub use docsync_error::{DocSyncError, DocSyncResult};
pub use error_code::DocSyncErrorCode;
pub use ingest_error::IngestError;
pub use source_error::SourceError;
pub use storage_error::StorageError;
pub use transport_error::TransportError;
