use serde::{Deserialize, Serialize};

use super::defaults;

/// Client-side agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Stable id of the source scope (the vault); prefixes every external id.
    pub source_scope_id: String,
    /// Human-readable source name sent with each batch.
    pub source_name: Option<String>,
    /// Id of this agent instance.
    pub agent_id: String,
    /// Root directory of the vault on disk.
    pub vault_path: String,
    /// Quiet period after the last change before a flush fires.
    pub debounce_ms: u64,
    /// Safety-net flush interval in seconds.
    pub periodic_flush_secs: u64,
    /// Maximum number of queue entries materialized per batch.
    pub max_items_per_batch: usize,
    /// Maximum JSON-serialized size of the items in one batch.
    pub max_bytes_per_batch: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            source_scope_id: defaults::DEFAULT_SOURCE_SCOPE_ID.to_string(),
            source_name: None,
            agent_id: defaults::DEFAULT_AGENT_ID.to_string(),
            vault_path: defaults::DEFAULT_VAULT_PATH.to_string(),
            debounce_ms: defaults::DEFAULT_DEBOUNCE_MS,
            periodic_flush_secs: defaults::DEFAULT_PERIODIC_FLUSH_SECS,
            max_items_per_batch: defaults::DEFAULT_MAX_ITEMS_PER_BATCH,
            max_bytes_per_batch: defaults::DEFAULT_MAX_BYTES_PER_BATCH,
        }
    }
}
