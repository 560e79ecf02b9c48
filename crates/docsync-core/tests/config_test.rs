use std::collections::HashMap;

use docsync_core::config::{defaults, DocSyncConfig};
use docsync_core::errors::{ConfigError, DocSyncErrorCode};

// ─── Defaults ─────────────────────────────────────────────

#[test]
fn empty_toml_yields_defaults() {
    let config = DocSyncConfig::from_toml("").unwrap();
    assert_eq!(config.agent.source_scope_id, defaults::DEFAULT_SOURCE_SCOPE_ID);
    assert_eq!(config.agent.max_items_per_batch, defaults::DEFAULT_MAX_ITEMS_PER_BATCH);
    assert_eq!(config.agent.max_bytes_per_batch, defaults::DEFAULT_MAX_BYTES_PER_BATCH);
    assert_eq!(config.transport.backoff_floor_ms, defaults::DEFAULT_BACKOFF_FLOOR_MS);
    assert_eq!(config.server.bind_addr, defaults::DEFAULT_BIND_ADDR);
    assert!(config.server.connections.is_empty());
    assert!(config.transport.endpoint_url.is_none());
    assert!(config.validate().is_ok());
}

#[test]
fn partial_sections_keep_remaining_defaults() {
    let config = DocSyncConfig::from_toml(
        r#"
        [agent]
        source_scope_id = "work-vault"
        debounce_ms = 500

        [transport]
        endpoint_url = "https://sync.example.com"
        "#,
    )
    .unwrap();
    assert_eq!(config.agent.source_scope_id, "work-vault");
    assert_eq!(config.agent.debounce_ms, 500);
    assert_eq!(config.agent.agent_id, defaults::DEFAULT_AGENT_ID);
    assert_eq!(
        config.transport.endpoint_url.as_deref(),
        Some("https://sync.example.com")
    );
    assert_eq!(config.transport.request_timeout_secs, defaults::DEFAULT_REQUEST_TIMEOUT_SECS);
}

#[test]
fn connections_parse_from_array_of_tables() {
    let config = DocSyncConfig::from_toml(
        r#"
        [[server.connections]]
        scope_id = "vault-a"
        name = "Personal"
        token = "secret-a"

        [[server.connections]]
        scope_id = "vault-b"
        token = "secret-b"
        "#,
    )
    .unwrap();
    assert_eq!(config.server.connections.len(), 2);
    assert_eq!(config.server.connections[0].name.as_deref(), Some("Personal"));
    assert!(config.server.connections[1].name.is_none());
    assert!(config.validate().is_ok());
}

#[test]
fn malformed_toml_is_parse_error() {
    let err = DocSyncConfig::from_toml("[agent\nfoo = ").unwrap_err();
    assert!(matches!(err, ConfigError::ParseError { .. }));
    assert_eq!(err.error_code(), "CONFIG_ERROR");
}

// ─── Environment overrides ────────────────────────────────

#[test]
fn overrides_take_precedence_over_file_values() {
    let mut config = DocSyncConfig::from_toml(
        r#"
        [transport]
        endpoint_url = "http://from-file"
        token = "file-token"
        "#,
    )
    .unwrap();

    let env: HashMap<&str, &str> = [
        ("DOCSYNC_ENDPOINT", "http://from-env"),
        ("DOCSYNC_TOKEN", "env-token"),
        ("DOCSYNC_DB_PATH", "/tmp/agent.db"),
    ]
    .into_iter()
    .collect();
    config.apply_overrides_from(|key| env.get(key).map(|v| v.to_string()));

    assert_eq!(config.transport.endpoint_url.as_deref(), Some("http://from-env"));
    assert_eq!(config.transport.token.as_deref(), Some("env-token"));
    assert_eq!(config.storage.db_path, "/tmp/agent.db");
    assert_eq!(config.server.bind_addr, defaults::DEFAULT_BIND_ADDR);
}

#[test]
fn load_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("docsync.toml");
    std::fs::write(&path, "[agent]\nagent_id = \"laptop\"\n").unwrap();

    let config = DocSyncConfig::load(&path).unwrap();
    assert_eq!(config.agent.agent_id, "laptop");
}

#[test]
fn load_missing_file_is_not_found() {
    let err = DocSyncConfig::load(std::path::Path::new("/nonexistent/docsync.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound { .. }));
}

// ─── Validation ───────────────────────────────────────────

fn validation_field(toml: &str) -> String {
    match DocSyncConfig::from_toml(toml).unwrap().validate() {
        Err(ConfigError::ValidationFailed { field, .. }) => field,
        other => panic!("expected validation failure, got {other:?}"),
    }
}

#[test]
fn scope_id_must_not_contain_separator() {
    assert_eq!(
        validation_field("[agent]\nsource_scope_id = \"a::b\""),
        "agent.source_scope_id"
    );
    assert_eq!(
        validation_field("[agent]\nsource_scope_id = \"  \""),
        "agent.source_scope_id"
    );
}

#[test]
fn zero_batch_limits_are_rejected() {
    assert_eq!(
        validation_field("[agent]\nmax_items_per_batch = 0"),
        "agent.max_items_per_batch"
    );
    assert_eq!(
        validation_field("[agent]\nmax_bytes_per_batch = 0"),
        "agent.max_bytes_per_batch"
    );
    assert_eq!(
        validation_field("[server]\nmax_in_flight_batches = 0"),
        "server.max_in_flight_batches"
    );
}

#[test]
fn backoff_cap_below_floor_is_rejected() {
    assert_eq!(
        validation_field("[transport]\nbackoff_floor_ms = 5000\nbackoff_max_ms = 100"),
        "transport.backoff_max_ms"
    );
}

#[test]
fn duplicate_connection_scope_is_rejected() {
    let toml = r#"
        [[server.connections]]
        scope_id = "vault-a"
        token = "t1"

        [[server.connections]]
        scope_id = "vault-a"
        token = "t2"
    "#;
    assert_eq!(validation_field(toml), "server.connections.scope_id");
}

#[test]
fn empty_connection_token_is_rejected() {
    let toml = r#"
        [[server.connections]]
        scope_id = "vault-a"
        token = ""
    "#;
    assert_eq!(validation_field(toml), "server.connections.token");
}
