use serde::{Deserialize, Serialize};

use super::defaults;

/// Ingestion server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the HTTP listener binds to.
    pub bind_addr: String,
    /// Largest `items` array accepted in one batch.
    pub max_items_per_batch: usize,
    /// Batches processed concurrently before answering 503.
    pub max_in_flight_batches: usize,
    /// `Retry-After` hint sent with 503 responses.
    pub busy_retry_after_secs: u64,
    /// Request body size limit.
    pub max_body_bytes: usize,
    /// Registered push connections.
    pub connections: Vec<ConnectionConfig>,
}

/// One registered source scope and the credential allowed to push into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub scope_id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub token: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: defaults::DEFAULT_BIND_ADDR.to_string(),
            max_items_per_batch: defaults::DEFAULT_SERVER_MAX_ITEMS_PER_BATCH,
            max_in_flight_batches: defaults::DEFAULT_MAX_IN_FLIGHT_BATCHES,
            busy_retry_after_secs: defaults::DEFAULT_BUSY_RETRY_AFTER_SECS,
            max_body_bytes: defaults::DEFAULT_MAX_BODY_BYTES,
            connections: Vec::new(),
        }
    }
}
