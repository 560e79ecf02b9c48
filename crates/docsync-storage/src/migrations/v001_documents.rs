//! V001: server-side committed documents and per-scope sync cursors.

pub const MIGRATION_SQL: &str = r#"
-- One row per (scope, document). A tombstone keeps the row with content
-- cleared and deleted_at_source set.
CREATE TABLE IF NOT EXISTS documents (
    scope_id TEXT NOT NULL,
    external_id TEXT NOT NULL,
    title TEXT,
    content_markdown TEXT,
    content_hash TEXT,
    updated_at_source TEXT,
    deleted_at_source TEXT,
    metadata TEXT NOT NULL DEFAULT '{}',
    synced_at TEXT NOT NULL,
    PRIMARY KEY (scope_id, external_id)
) STRICT;

-- Downstream readers only look at live documents, oldest edit first.
CREATE INDEX IF NOT EXISTS idx_documents_live
    ON documents(scope_id, updated_at_source)
    WHERE deleted_at_source IS NULL;

CREATE TABLE IF NOT EXISTS sync_cursors (
    scope_id TEXT PRIMARY KEY,
    since TEXT NOT NULL,
    updated_at TEXT NOT NULL
) STRICT;
"#;
