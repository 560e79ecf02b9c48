//! Operator-facing status projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Failure classes an operator can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Network failure, 429 or 503. Retried automatically.
    Transient,
    /// 401. Credentials must be refreshed out-of-band.
    Credential,
    /// 400 or rejected items. Retrying identical input fails identically.
    Validation,
    /// Local storage or vault read failure.
    Local,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Transient => "transient",
            ErrorClass::Credential => "credential",
            ErrorClass::Validation => "validation",
            ErrorClass::Local => "local",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "transient" => Some(ErrorClass::Transient),
            "credential" => Some(ErrorClass::Credential),
            "validation" => Some(ErrorClass::Validation),
            "local" => Some(ErrorClass::Local),
            _ => None,
        }
    }
}

/// Read-only view over the agent's durable state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatusReport {
    pub last_successful_sync_at: Option<DateTime<Utc>>,
    pub pending_queue_depth: usize,
    pub indexed_documents: usize,
    pub last_error_class: Option<ErrorClass>,
    pub last_error_message: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
    /// Automatic flushing is paused until credentials are replaced.
    pub auth_required: bool,
}
