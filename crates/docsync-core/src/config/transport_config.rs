use serde::{Deserialize, Serialize};

use super::defaults;

/// Agent transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Base URL of the ingestion server.
    pub endpoint_url: Option<String>,
    /// Bearer credential. Usually supplied through `DOCSYNC_TOKEN`.
    pub token: Option<String>,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Backoff floor in milliseconds (first retry delay).
    pub backoff_floor_ms: u64,
    /// Backoff cap in milliseconds.
    pub backoff_max_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            token: None,
            request_timeout_secs: defaults::DEFAULT_REQUEST_TIMEOUT_SECS,
            backoff_floor_ms: defaults::DEFAULT_BACKOFF_FLOOR_MS,
            backoff_max_ms: defaults::DEFAULT_BACKOFF_MAX_MS,
        }
    }
}
