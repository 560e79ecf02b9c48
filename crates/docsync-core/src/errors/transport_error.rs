use super::error_code::{self, DocSyncErrorCode};

/// Transport errors between the agent and the ingestion server.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {reason}")]
    NetworkError { reason: String },

    #[error("unauthorized: {reason}")]
    Unauthorized { reason: String },

    #[error("batch rejected with HTTP {status}: {message}")]
    BatchRejected { status: u16, message: String },

    #[error("server busy (HTTP {status}), retry after {retry_after_secs:?}s")]
    RateLimited {
        status: u16,
        retry_after_secs: Option<u64>,
    },

    #[error("could not decode server response: {reason}")]
    DecodeFailed { reason: String },

    #[error("no endpoint configured")]
    NotConfigured,
}

impl DocSyncErrorCode for TransportError {
    fn error_code(&self) -> &'static str {
        match self {
            TransportError::NetworkError { .. } | TransportError::NotConfigured => {
                error_code::NETWORK_ERROR
            }
            TransportError::Unauthorized { .. } => error_code::UNAUTHORIZED,
            TransportError::BatchRejected { .. } => error_code::BATCH_REJECTED,
            TransportError::RateLimited { .. } => error_code::RATE_LIMITED,
            TransportError::DecodeFailed { .. } => error_code::DECODE_ERROR,
        }
    }
}
