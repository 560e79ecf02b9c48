//! Scope filter: decides which vault paths participate in sync.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::config::ScopeConfig;
use crate::content::normalize_path;
use crate::errors::ConfigError;

/// Compiled include/exclude glob sets.
///
/// A path is in scope when it matches at least one include pattern (or the
/// include list is empty) and matches no exclude pattern. Paths are
/// normalized before matching, and `*` never crosses a `/`.
#[derive(Debug, Clone)]
pub struct ScopeFilter {
    include: GlobSet,
    exclude: GlobSet,
    include_all: bool,
}

impl ScopeFilter {
    /// Compile the patterns of a scope config.
    pub fn compile(config: &ScopeConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            include: build_set("scope.include", &config.include)?,
            exclude: build_set("scope.exclude", &config.exclude)?,
            include_all: config.include.is_empty(),
        })
    }

    /// A filter that admits every path.
    pub fn allow_all() -> Self {
        Self {
            include: GlobSet::empty(),
            exclude: GlobSet::empty(),
            include_all: true,
        }
    }

    pub fn is_included(&self, path: &str) -> bool {
        let path = normalize_path(path);
        if path.is_empty() {
            return false;
        }
        (self.include_all || self.include.is_match(&path)) && !self.exclude.is_match(&path)
    }
}

fn build_set(field: &str, patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: field.to_string(),
                message: format!("{pattern}: {e}"),
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| ConfigError::InvalidValue {
        field: field.to_string(),
        message: e.to_string(),
    })
}
