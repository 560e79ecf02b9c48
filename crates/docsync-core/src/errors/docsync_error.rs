//! Top-level error type aggregating every subsystem error.

use super::error_code::{self, DocSyncErrorCode};
use super::{ConfigError, IngestError, SourceError, StorageError, TransportError};

/// Umbrella error for the sync engine.
#[derive(Debug, thiserror::Error)]
pub enum DocSyncError {
    #[error(transparent)]
    StorageError(#[from] StorageError),

    #[error(transparent)]
    ConfigError(#[from] ConfigError),

    #[error(transparent)]
    TransportError(#[from] TransportError),

    #[error(transparent)]
    IngestError(#[from] IngestError),

    #[error(transparent)]
    SourceError(#[from] SourceError),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type DocSyncResult<T> = Result<T, DocSyncError>;

impl DocSyncErrorCode for DocSyncError {
    fn error_code(&self) -> &'static str {
        match self {
            DocSyncError::StorageError(e) => e.error_code(),
            DocSyncError::ConfigError(e) => e.error_code(),
            DocSyncError::TransportError(e) => e.error_code(),
            DocSyncError::IngestError(e) => e.error_code(),
            DocSyncError::SourceError(e) => e.error_code(),
            DocSyncError::SerializationError(_) => error_code::SERIALIZATION_ERROR,
        }
    }
}
