//! Registered push connections: which bearer credential may write into
//! which source scope.

use std::collections::HashMap;

use docsync_core::config::ConnectionConfig;
use docsync_core::errors::IngestError;

#[derive(Debug, Clone)]
pub struct Registration {
    pub scope_id: String,
    pub name: Option<String>,
    token: String,
}

#[derive(Debug, Default)]
pub struct ScopeRegistry {
    by_scope: HashMap<String, Registration>,
}

/// Compare without an early exit on the first differing byte.
fn tokens_match(expected: &str, presented: &str) -> bool {
    expected.len() == presented.len()
        && expected
            .bytes()
            .zip(presented.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

impl ScopeRegistry {
    pub fn from_config(connections: &[ConnectionConfig]) -> Self {
        let mut registry = Self::default();
        for conn in connections {
            registry.register(&conn.scope_id, conn.name.clone(), &conn.token);
        }
        registry
    }

    /// Add or replace the registration for `scope_id`.
    pub fn register(&mut self, scope_id: &str, name: Option<String>, token: &str) {
        self.by_scope.insert(
            scope_id.to_string(),
            Registration {
                scope_id: scope_id.to_string(),
                name,
                token: token.to_string(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.by_scope.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_scope.is_empty()
    }

    /// Whether the credential belongs to any registered connection.
    pub fn recognizes(&self, token: &str) -> bool {
        self.by_scope
            .values()
            .any(|reg| tokens_match(&reg.token, token))
    }

    /// Resolve the scope a request targets and check the credential may
    /// write to it.
    pub fn authorize(&self, scope_id: &str, token: &str) -> Result<&Registration, IngestError> {
        let registration =
            self.by_scope
                .get(scope_id)
                .ok_or_else(|| IngestError::UnknownScope {
                    scope_id: scope_id.to_string(),
                })?;
        if !tokens_match(&registration.token, token) {
            return Err(IngestError::Unauthorized);
        }
        Ok(registration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ScopeRegistry {
        ScopeRegistry::from_config(&[
            ConnectionConfig {
                scope_id: "work".into(),
                name: Some("Work vault".into()),
                token: "t-work".into(),
            },
            ConnectionConfig {
                scope_id: "home".into(),
                name: None,
                token: "t-home".into(),
            },
        ])
    }

    #[test]
    fn token_is_bound_to_its_scope() {
        let registry = registry();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.authorize("work", "t-work").unwrap().scope_id, "work");
        assert!(matches!(
            registry.authorize("work", "t-home"),
            Err(IngestError::Unauthorized)
        ));
        assert!(matches!(
            registry.authorize("play", "t-home"),
            Err(IngestError::UnknownScope { .. })
        ));
    }

    #[test]
    fn recognizes_only_registered_tokens() {
        let registry = registry();
        assert!(registry.recognizes("t-home"));
        assert!(!registry.recognizes("t-hom"));
        assert!(!registry.recognizes(""));
        assert!(!ScopeRegistry::default().recognizes("t-home"));
    }
}
