use super::error_code::{self, DocSyncErrorCode};

/// Batch-level ingestion errors. Per-item problems never surface here; they
/// become rejected item results instead.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("invalid batch: {reason}")]
    InvalidBatch { reason: String },

    #[error("unknown source scope: {scope_id}")]
    UnknownScope { scope_id: String },

    #[error("missing or invalid credential")]
    Unauthorized,
}

impl DocSyncErrorCode for IngestError {
    fn error_code(&self) -> &'static str {
        match self {
            IngestError::InvalidBatch { .. } => error_code::INVALID_BATCH,
            IngestError::UnknownScope { .. } => error_code::UNKNOWN_SCOPE,
            IngestError::Unauthorized => error_code::UNAUTHORIZED,
        }
    }
}
