// Single source of truth for all default values.

// --- Agent ---
pub const DEFAULT_AGENT_ID: &str = "default";
pub const DEFAULT_SOURCE_SCOPE_ID: &str = "vault";
pub const DEFAULT_VAULT_PATH: &str = ".";
pub const DEFAULT_DEBOUNCE_MS: u64 = 2_000;
pub const DEFAULT_PERIODIC_FLUSH_SECS: u64 = 300; // 5 minutes
pub const DEFAULT_MAX_ITEMS_PER_BATCH: usize = 100;
pub const DEFAULT_MAX_BYTES_PER_BATCH: usize = 1_048_576; // 1 MiB

// --- Scope ---
pub const DEFAULT_INCLUDE_GLOBS: &[&str] = &["**/*.md"];
pub const DEFAULT_EXCLUDE_GLOBS: &[&str] = &[".obsidian/**", ".trash/**", ".git/**"];

// --- Transport ---
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_BACKOFF_FLOOR_MS: u64 = 1_000;
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 60_000;

// --- Server ---
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";
pub const DEFAULT_SERVER_MAX_ITEMS_PER_BATCH: usize = 500;
pub const DEFAULT_MAX_IN_FLIGHT_BATCHES: usize = 16;
pub const DEFAULT_BUSY_RETRY_AFTER_SECS: u64 = 5;
pub const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1_048_576; // 8 MiB

// --- Storage ---
pub const DEFAULT_DB_FILENAME: &str = "docsync.db";
pub const DEFAULT_READ_POOL_SIZE: usize = 4;
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 5_000;

// --- Observability ---
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_JSON_LOGS: bool = false;
