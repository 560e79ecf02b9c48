use super::error_code::{self, DocSyncErrorCode};

/// Errors reading from a document source (the local vault).
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: String, reason: String },

    #[error("failed to enumerate source root {root}: {reason}")]
    ScanFailed { root: String, reason: String },
}

impl DocSyncErrorCode for SourceError {
    fn error_code(&self) -> &'static str {
        error_code::SOURCE_ERROR
    }
}
