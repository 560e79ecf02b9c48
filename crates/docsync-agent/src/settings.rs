//! Immutable agent settings derived from configuration.

use std::time::Duration;

use docsync_core::config::DocSyncConfig;
use docsync_core::errors::ConfigError;
use docsync_core::ScopeFilter;

/// Configuration plus everything compiled from it. Never mutated: a change
/// produces a new value which the agent swaps in between flushes.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    config: DocSyncConfig,
    scope: ScopeFilter,
}

/// Batch size caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_items: usize,
    pub max_bytes: usize,
}

impl AgentSettings {
    /// Validate the config and compile the scope filter.
    pub fn from_config(config: DocSyncConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let scope = ScopeFilter::compile(&config.scope)?;
        Ok(Self { config, scope })
    }

    /// Derive new settings from a modified copy of this configuration.
    pub fn update<F>(&self, edit: F) -> Result<Self, ConfigError>
    where
        F: FnOnce(&mut DocSyncConfig),
    {
        let mut config = self.config.clone();
        edit(&mut config);
        Self::from_config(config)
    }

    pub fn config(&self) -> &DocSyncConfig {
        &self.config
    }

    pub fn scope(&self) -> &ScopeFilter {
        &self.scope
    }

    pub fn scope_id(&self) -> &str {
        &self.config.agent.source_scope_id
    }

    pub fn limits(&self) -> BatchLimits {
        BatchLimits {
            max_items: self.config.agent.max_items_per_batch,
            max_bytes: self.config.agent.max_bytes_per_batch,
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.config.agent.debounce_ms)
    }

    pub fn periodic_flush(&self) -> Duration {
        Duration::from_secs(self.config.agent.periodic_flush_secs)
    }

    pub fn backoff_floor(&self) -> Duration {
        Duration::from_millis(self.config.transport.backoff_floor_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.config.transport.backoff_max_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_recompiles_scope_without_touching_original() {
        let original = AgentSettings::from_config(DocSyncConfig::default()).unwrap();
        let updated = original
            .update(|c| c.scope.include = vec!["**/*.txt".into()])
            .unwrap();

        assert!(original.scope().is_included("a.md"));
        assert!(!original.scope().is_included("a.txt"));
        assert!(updated.scope().is_included("a.txt"));
        assert!(!updated.scope().is_included("a.md"));
    }

    #[test]
    fn invalid_update_is_rejected() {
        let original = AgentSettings::from_config(DocSyncConfig::default()).unwrap();
        assert!(original.update(|c| c.agent.max_items_per_batch = 0).is_err());
        assert!(original.update(|c| c.scope.exclude = vec!["[".into()]).is_err());
    }
}
