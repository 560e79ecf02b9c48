use serde::{Deserialize, Serialize};

use super::defaults;

/// Glob include/exclude patterns deciding which vault paths are synced.
/// Patterns are matched against vault-relative paths with `/` separators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            include: defaults::DEFAULT_INCLUDE_GLOBS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            exclude: defaults::DEFAULT_EXCLUDE_GLOBS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}
