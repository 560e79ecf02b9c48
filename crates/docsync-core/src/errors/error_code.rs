//! Stable machine-readable error codes.

/// Every error enum exposes a stable code string. The agent status
/// projection and the server's JSON error bodies carry these codes.
pub trait DocSyncErrorCode {
    /// Returns the error code string (e.g. `"STORAGE_ERROR"`).
    fn error_code(&self) -> &'static str;

    /// Returns `[ERROR_CODE] message`.
    fn coded_string(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
pub const MIGRATION_FAILED: &str = "MIGRATION_FAILED";
pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
pub const BATCH_REJECTED: &str = "BATCH_REJECTED";
pub const RATE_LIMITED: &str = "RATE_LIMITED";
pub const DECODE_ERROR: &str = "DECODE_ERROR";
pub const INVALID_BATCH: &str = "INVALID_BATCH";
pub const UNKNOWN_SCOPE: &str = "UNKNOWN_SCOPE";
pub const SOURCE_ERROR: &str = "SOURCE_ERROR";
pub const SERIALIZATION_ERROR: &str = "SERIALIZATION_ERROR";
