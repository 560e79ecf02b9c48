//! Delivery of batches to the ingestion server.
//!
//! A send never fails with an error value: every response (or lack of one)
//! maps to a [`TransportOutcome`] the flush engine can act on.

use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::RETRY_AFTER;

use docsync_core::config::TransportConfig;
use docsync_core::errors::TransportError;
use docsync_core::models::{
    BatchResponse, ErrorResponse, SyncRequest, PROTOCOL_HEADER, PROTOCOL_VERSION,
    SYNC_BATCHES_PATH,
};

/// How a batch send ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportOutcome {
    /// 2xx with per-item results.
    Delivered(BatchResponse),
    /// 401. Not retried automatically.
    Unauthorized { message: String },
    /// Any other 4xx. The batch as built will never succeed.
    Rejected { status: u16, message: String },
    /// Network failure, timeout, 429, or 5xx.
    Retryable {
        status: Option<u16>,
        retry_after: Option<Duration>,
        reason: String,
    },
}

impl TransportOutcome {
    /// The failure as an error value, for status reporting.
    pub fn to_error(&self) -> Option<TransportError> {
        match self {
            TransportOutcome::Delivered(_) => None,
            TransportOutcome::Unauthorized { message } => Some(TransportError::Unauthorized {
                reason: message.clone(),
            }),
            TransportOutcome::Rejected { status, message } => {
                Some(TransportError::BatchRejected {
                    status: *status,
                    message: message.clone(),
                })
            }
            TransportOutcome::Retryable {
                status: Some(status),
                retry_after,
                ..
            } => Some(TransportError::RateLimited {
                status: *status,
                retry_after_secs: retry_after.map(|d| d.as_secs()),
            }),
            TransportOutcome::Retryable {
                status: None,
                reason,
                ..
            } => Some(TransportError::NetworkError {
                reason: reason.clone(),
            }),
        }
    }
}

/// Sends one batch. Implementations must be safe to call again with the
/// same request: delivery is at-least-once.
pub trait SyncTransport: Send + Sync {
    fn send_batch(&self, request: &SyncRequest) -> impl Future<Output = TransportOutcome> + Send;
}

/// Provides the bearer credential for each request.
pub trait CredentialStore: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// An in-memory credential that an operator can replace at runtime.
#[derive(Debug, Default)]
pub struct StaticCredentials {
    token: RwLock<Option<String>>,
}

impl StaticCredentials {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    pub fn set_token(&self, token: Option<String>) {
        let mut guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        *guard = token;
    }
}

impl CredentialStore for StaticCredentials {
    fn bearer_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Parse a `Retry-After` value: delta-seconds or an HTTP date.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

/// Map a non-2xx status to an outcome.
pub fn classify_failure(status: u16, retry_after: Option<Duration>, body: &str) -> TransportOutcome {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|e| format!("{}: {}", e.code, e.error))
        .unwrap_or_else(|_| truncate(body, 512));

    match status {
        401 => TransportOutcome::Unauthorized { message },
        429 | 500..=599 => TransportOutcome::Retryable {
            status: Some(status),
            retry_after,
            reason: format!("HTTP {status}: {message}"),
        },
        _ => TransportOutcome::Rejected { status, message },
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

/// HTTP transport: `POST {endpoint}/api/v1/sync/batches` with a bearer token.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    credentials: Arc<dyn CredentialStore>,
}

impl HttpTransport {
    pub fn new(
        config: &TransportConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, TransportError> {
        let endpoint = config
            .endpoint_url
            .as_deref()
            .ok_or(TransportError::NotConfigured)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("docsync-agent/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::NetworkError {
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            url: format!("{}{}", endpoint.trim_end_matches('/'), SYNC_BATCHES_PATH),
            credentials,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl SyncTransport for HttpTransport {
    async fn send_batch(&self, request: &SyncRequest) -> TransportOutcome {
        let Some(token) = self.credentials.bearer_token() else {
            return TransportOutcome::Unauthorized {
                message: "no credential configured".to_string(),
            };
        };

        let response = match self
            .client
            .post(&self.url)
            .bearer_auth(token)
            .header(PROTOCOL_HEADER, PROTOCOL_VERSION)
            .json(request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let reason = if e.is_timeout() {
                    format!("request timed out: {e}")
                } else {
                    e.to_string()
                };
                return TransportOutcome::Retryable {
                    status: None,
                    retry_after: None,
                    reason,
                };
            }
        };

        let status = response.status();
        if status.is_success() {
            return match response.json::<BatchResponse>().await {
                Ok(body) => TransportOutcome::Delivered(body),
                // The server may have applied the batch; resending is safe.
                Err(e) => TransportOutcome::Retryable {
                    status: None,
                    retry_after: None,
                    reason: format!("undecodable response: {e}"),
                },
            };
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| parse_retry_after(v, Utc::now()));
        let body = response.text().await.unwrap_or_default();
        classify_failure(status.as_u16(), retry_after, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn retry_after_accepts_seconds_and_dates() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_retry_after(" 7 ", now), Some(Duration::from_secs(7)));
        assert_eq!(
            parse_retry_after("Mon, 01 Jan 2024 00:00:30 GMT", now),
            Some(Duration::from_secs(30))
        );
        assert_eq!(
            parse_retry_after("Sun, 31 Dec 2023 23:59:00 GMT", now),
            Some(Duration::ZERO)
        );
        assert_eq!(parse_retry_after("soon", now), None);
    }

    #[test]
    fn classification_by_status() {
        assert!(matches!(
            classify_failure(401, None, ""),
            TransportOutcome::Unauthorized { .. }
        ));
        assert!(matches!(
            classify_failure(400, None, r#"{"code":"INVALID_BATCH","error":"items empty"}"#),
            TransportOutcome::Rejected { status: 400, ref message } if message == "INVALID_BATCH: items empty"
        ));
        assert!(matches!(
            classify_failure(404, None, "nope"),
            TransportOutcome::Rejected { status: 404, .. }
        ));
        for status in [429, 500, 502, 503] {
            assert!(matches!(
                classify_failure(status, None, ""),
                TransportOutcome::Retryable { status: Some(s), .. } if s == status
            ));
        }
    }

    #[test]
    fn missing_endpoint_is_not_configured() {
        let err = HttpTransport::new(
            &TransportConfig::default(),
            Arc::new(StaticCredentials::new(None)),
        )
        .err();
        assert!(matches!(err, Some(TransportError::NotConfigured)));
    }
}
