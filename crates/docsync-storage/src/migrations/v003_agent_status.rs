//! V003: single-row agent status used by the operator status projection.

pub const MIGRATION_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS agent_status (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    last_successful_sync_at TEXT,
    last_error_class TEXT,
    last_error_message TEXT,
    last_error_at TEXT,
    auth_required INTEGER NOT NULL DEFAULT 0
) STRICT;

INSERT OR IGNORE INTO agent_status (id) VALUES (1);
"#;
