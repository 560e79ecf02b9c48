//! V002: agent pending operation queue and local change index.

pub const MIGRATION_SQL: &str = r#"
-- seq gives FIFO order; re-enqueueing a key updates the row in place and
-- keeps its position.
CREATE TABLE IF NOT EXISTS pending_ops (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    op TEXT NOT NULL CHECK (op IN ('upsert', 'delete')),
    external_id TEXT NOT NULL,
    path TEXT NOT NULL,
    last_seen_change_token INTEGER NOT NULL,
    enqueued_at TEXT NOT NULL,
    UNIQUE (op, external_id, path)
) STRICT;

-- Written only after the server acknowledged persistence.
CREATE TABLE IF NOT EXISTS local_index (
    external_id TEXT PRIMARY KEY,
    path TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    last_synced_at TEXT NOT NULL,
    last_seen_change_token INTEGER NOT NULL
) STRICT;

CREATE INDEX IF NOT EXISTS idx_local_index_path ON local_index(path);
"#;
