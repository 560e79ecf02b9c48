//! Top-level configuration with file + environment resolution.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{
    AgentConfig, ObservabilityConfig, ScopeConfig, ServerConfig, StorageConfig, TransportConfig,
};
use crate::errors::ConfigError;

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. Environment variables (`DOCSYNC_*`)
/// 2. Config file passed to [`DocSyncConfig::load`]
/// 3. Compiled defaults
///
/// The value is immutable once built. Components receive it (or a value
/// derived from it) at construction time.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DocSyncConfig {
    pub agent: AgentConfig,
    pub scope: ScopeConfig,
    pub transport: TransportConfig,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub observability: ObservabilityConfig,
}

impl DocSyncConfig {
    /// Load configuration from a TOML file, then apply `DOCSYNC_*`
    /// environment overrides and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        let mut config: DocSyncConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        config.apply_overrides_from(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (no environment overrides).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }

    /// Apply overrides from a key lookup. `load` passes the process
    /// environment; tests pass a map.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup("DOCSYNC_ENDPOINT") {
            self.transport.endpoint_url = Some(endpoint);
        }
        if let Some(token) = lookup("DOCSYNC_TOKEN") {
            self.transport.token = Some(token);
        }
        if let Some(db_path) = lookup("DOCSYNC_DB_PATH") {
            self.storage.db_path = db_path;
        }
        if let Some(vault) = lookup("DOCSYNC_VAULT_PATH") {
            self.agent.vault_path = vault;
        }
        if let Some(bind) = lookup("DOCSYNC_BIND_ADDR") {
            self.server.bind_addr = bind;
        }
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.source_scope_id.trim().is_empty() {
            return Err(invalid("agent.source_scope_id", "must not be empty"));
        }
        if self.agent.source_scope_id.contains("::") {
            return Err(invalid("agent.source_scope_id", "must not contain '::'"));
        }
        if self.agent.agent_id.trim().is_empty() {
            return Err(invalid("agent.agent_id", "must not be empty"));
        }
        if self.agent.max_items_per_batch == 0 {
            return Err(invalid("agent.max_items_per_batch", "must be greater than 0"));
        }
        if self.agent.max_bytes_per_batch == 0 {
            return Err(invalid("agent.max_bytes_per_batch", "must be greater than 0"));
        }
        if self.transport.backoff_floor_ms == 0 {
            return Err(invalid("transport.backoff_floor_ms", "must be greater than 0"));
        }
        if self.transport.backoff_max_ms < self.transport.backoff_floor_ms {
            return Err(invalid(
                "transport.backoff_max_ms",
                "must be at least transport.backoff_floor_ms",
            ));
        }
        if self.server.max_items_per_batch == 0 {
            return Err(invalid("server.max_items_per_batch", "must be greater than 0"));
        }
        if self.server.max_in_flight_batches == 0 {
            return Err(invalid("server.max_in_flight_batches", "must be greater than 0"));
        }
        let mut seen = std::collections::HashSet::new();
        for conn in &self.server.connections {
            if conn.scope_id.trim().is_empty() {
                return Err(invalid("server.connections.scope_id", "must not be empty"));
            }
            if conn.token.is_empty() {
                return Err(invalid(
                    "server.connections.token",
                    &format!("empty token for scope {}", conn.scope_id),
                ));
            }
            if !seen.insert(conn.scope_id.as_str()) {
                return Err(invalid(
                    "server.connections.scope_id",
                    &format!("duplicate scope {}", conn.scope_id),
                ));
            }
        }
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::ValidationFailed {
        field: field.to_string(),
        message: message.to_string(),
    }
}
