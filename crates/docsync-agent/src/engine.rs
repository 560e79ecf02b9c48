//! Flush engine: single-flight delivery of the pending queue.
//!
//! `flush` never returns an error. Every failure becomes a [`FlushOutcome`]
//! plus a status row update, so the scheduler loop can always continue.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::Utc;

use docsync_core::config::DocSyncConfig;
use docsync_core::errors::{ConfigError, DocSyncResult};
use docsync_core::models::protocol::reasons;
use docsync_core::models::{
    BatchResponse, ErrorClass, IndexUpdate, ItemResult, ItemStatus, QueueAck, SyncRequest,
    SyncStatusReport,
};
use docsync_core::traits::IAgentStateStore;
use docsync_storage::StorageEngine;

use crate::backoff::Backoff;
use crate::batch::{BatchBuilder, BatchEntry};
use crate::diff::ScanDiff;
use crate::settings::AgentSettings;
use crate::source::DocumentSource;
use crate::tracker::ChangeTracker;
use crate::transport::{SyncTransport, TransportOutcome};

/// Counters for one flush that reached the server (or had nothing to send
/// after local filtering).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushSummary {
    /// Items in the request.
    pub sent: usize,
    pub accepted: usize,
    /// Resolver no-ops reported by the server.
    pub skipped: usize,
    /// Items the server rejected, permanently or not.
    pub rejected: usize,
    /// Upserts dropped locally because the content hash matched the index.
    pub unchanged: usize,
    /// Entries removed without delivery: out of scope, or `invalid_item`.
    pub dropped: usize,
    /// Queue entries removed by this flush.
    pub acknowledged: usize,
    /// Queue depth after the flush.
    pub remaining: usize,
}

impl FlushSummary {
    /// Whether the queue moved. A flush that removed nothing should not be
    /// retried right away.
    pub fn progressed(&self) -> bool {
        self.acknowledged > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Queue empty.
    Idle,
    /// Another flush holds the in-flight flag.
    AlreadyRunning,
    /// Flushing is paused until credentials are replaced.
    Paused,
    Delivered(FlushSummary),
    /// Transient failure. Try again after the delay.
    RetryAfter(Duration),
    /// The server refused the credential. Flushing is now paused.
    AuthRequired,
    /// The server refused the whole batch. Its entries were dropped.
    BatchRejected {
        status: u16,
        dropped: usize,
        remaining: usize,
    },
}

/// Clears the in-flight flag on drop, including on panic or cancellation.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One agent instance: a source, a durable store, and a transport.
pub struct SyncAgent<S, T> {
    settings: RwLock<Arc<AgentSettings>>,
    store: Arc<dyn IAgentStateStore>,
    source: S,
    transport: T,
    backoff: Mutex<Backoff>,
    in_flight: AtomicBool,
}

impl<S: DocumentSource, T: SyncTransport> SyncAgent<S, T> {
    pub fn new(
        settings: AgentSettings,
        store: Arc<dyn IAgentStateStore>,
        source: S,
        transport: T,
    ) -> Self {
        let backoff = Backoff::new(settings.backoff_floor(), settings.backoff_max());
        Self {
            settings: RwLock::new(Arc::new(settings)),
            store,
            source,
            transport,
            backoff: Mutex::new(backoff),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Open the agent's SQLite state at `storage.db_path` and build an agent
    /// on top of it.
    pub fn open(settings: AgentSettings, source: S, transport: T) -> DocSyncResult<Self> {
        let storage = &settings.config().storage;
        let engine = StorageEngine::open_with_config(Path::new(&storage.db_path), storage)?;
        Ok(Self::new(settings, Arc::new(engine), source, transport))
    }

    /// The settings in effect. A flush keeps the value it started with.
    pub fn settings(&self) -> Arc<AgentSettings> {
        self.settings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replace the settings with a derived copy. Takes effect from the next
    /// flush or event; an in-progress flush finishes with the old value.
    pub fn update_settings<F>(&self, edit: F) -> Result<Arc<AgentSettings>, ConfigError>
    where
        F: FnOnce(&mut DocSyncConfig),
    {
        let next = Arc::new(self.settings().update(edit)?);
        {
            let mut backoff = self.backoff.lock().unwrap_or_else(|e| e.into_inner());
            *backoff = Backoff::new(next.backoff_floor(), next.backoff_max());
        }
        *self.settings.write().unwrap_or_else(|e| e.into_inner()) = Arc::clone(&next);
        tracing::info!(scope = %next.scope_id(), "settings updated");
        Ok(next)
    }

    pub fn store(&self) -> &Arc<dyn IAgentStateStore> {
        &self.store
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_flushing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    // ─── Change events ────────────────────────────────────────────────

    pub fn on_create(&self, path: &str) -> DocSyncResult<bool> {
        let settings = self.settings();
        self.tracker(&settings).on_create(path)
    }

    pub fn on_modify(&self, path: &str) -> DocSyncResult<bool> {
        let settings = self.settings();
        self.tracker(&settings).on_modify(path)
    }

    pub fn on_delete(&self, path: &str) -> DocSyncResult<bool> {
        let settings = self.settings();
        self.tracker(&settings).on_delete(path)
    }

    pub fn on_rename(&self, old_path: &str, new_path: &str) -> DocSyncResult<usize> {
        let settings = self.settings();
        self.tracker(&settings).on_rename(old_path, new_path)
    }

    pub fn full_scan(&self) -> DocSyncResult<ScanDiff> {
        let settings = self.settings();
        self.tracker(&settings).full_scan()
    }

    fn tracker<'a>(&'a self, settings: &'a AgentSettings) -> ChangeTracker<'a> {
        ChangeTracker::new(self.store.as_ref(), &self.source, settings)
    }

    // ─── Status ───────────────────────────────────────────────────────

    pub fn status(&self) -> DocSyncResult<SyncStatusReport> {
        self.store.status()
    }

    /// Resume automatic flushing after the credential was replaced.
    pub fn clear_auth_pause(&self) -> DocSyncResult<()> {
        self.store.set_auth_required(false)?;
        self.backoff
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .reset();
        tracing::info!("auth pause cleared");
        Ok(())
    }

    // ─── Flush ────────────────────────────────────────────────────────

    /// Deliver one batch from the head of the queue.
    pub async fn flush(&self) -> FlushOutcome {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            tracing::debug!("flush already in flight");
            return FlushOutcome::AlreadyRunning;
        };
        let settings = self.settings();

        match self.flush_batch(&settings).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "flush failed locally");
                self.record_error(ErrorClass::Local, &e.to_string());
                FlushOutcome::RetryAfter(self.next_backoff(None))
            }
        }
    }

    async fn flush_batch(&self, settings: &AgentSettings) -> DocSyncResult<FlushOutcome> {
        if self.store.status()?.auth_required {
            return Ok(FlushOutcome::Paused);
        }

        let limits = settings.limits();
        let pending = self.store.pending_ops(limits.max_items)?;
        if pending.is_empty() {
            return Ok(FlushOutcome::Idle);
        }

        let batch = BatchBuilder::new(self.store.as_ref(), &self.source, settings)
            .build(&pending, limits)?;

        let mut summary = FlushSummary {
            unchanged: batch.unchanged.len(),
            dropped: batch.skipped.len(),
            ..FlushSummary::default()
        };

        let local_acks: Vec<QueueAck> = batch
            .skipped
            .iter()
            .map(|(key, token)| QueueAck {
                key: key.clone(),
                token: *token,
                index: IndexUpdate::Keep,
            })
            .chain(batch.unchanged.iter().map(|entry| QueueAck {
                key: entry.key.clone(),
                token: entry.token,
                index: IndexUpdate::RefreshToken {
                    external_id: entry.key.external_id.clone(),
                    token: entry.fresh_token,
                },
            }))
            .collect();
        if !local_acks.is_empty() {
            summary.acknowledged += self.store.acknowledge(&local_acks)?;
        }

        if batch.is_empty() {
            summary.remaining = self.store.pending_count()?;
            tracing::debug!(
                unchanged = summary.unchanged,
                dropped = summary.dropped,
                deferred = batch.deferred,
                "nothing to send after local filtering"
            );
            return Ok(FlushOutcome::Delivered(summary));
        }

        let entries = batch.entries;
        summary.sent = batch.items.len();
        let request = SyncRequest {
            source_scope_id: settings.scope_id().to_string(),
            source_name: settings.config().agent.source_name.clone(),
            agent_id: settings.config().agent.agent_id.clone(),
            sent_at: Utc::now(),
            items: batch.items,
        };

        tracing::debug!(items = summary.sent, bytes = batch.bytes, "sending batch");
        let outcome = self.transport.send_batch(&request).await;

        match outcome {
            TransportOutcome::Delivered(ref response) => {
                self.apply_results(&entries, response, &mut summary)?;
                Ok(FlushOutcome::Delivered(summary))
            }
            TransportOutcome::Unauthorized { ref message } => {
                tracing::error!(message = %message, "credential rejected, pausing flush");
                self.store.set_auth_required(true)?;
                self.record_error(ErrorClass::Credential, &error_text(&outcome));
                Ok(FlushOutcome::AuthRequired)
            }
            TransportOutcome::Rejected { status, ref message } => {
                tracing::error!(status, message = %message, items = entries.len(), "batch rejected, dropping");
                let acks: Vec<QueueAck> = entries
                    .iter()
                    .map(|entry| QueueAck {
                        key: entry.key.clone(),
                        token: entry.token,
                        index: IndexUpdate::Keep,
                    })
                    .collect();
                let dropped = self.store.acknowledge(&acks)?;
                self.record_error(ErrorClass::Validation, &error_text(&outcome));
                Ok(FlushOutcome::BatchRejected {
                    status,
                    dropped,
                    remaining: self.store.pending_count()?,
                })
            }
            TransportOutcome::Retryable {
                retry_after,
                ref reason,
                ..
            } => {
                let delay = self.next_backoff(retry_after);
                tracing::warn!(reason = %reason, delay_ms = delay.as_millis() as u64, "delivery failed, backing off");
                self.record_error(ErrorClass::Transient, &error_text(&outcome));
                Ok(FlushOutcome::RetryAfter(delay))
            }
        }
    }

    /// Per-item bookkeeping for a delivered batch.
    fn apply_results(
        &self,
        entries: &[BatchEntry],
        response: &BatchResponse,
        summary: &mut FlushSummary,
    ) -> DocSyncResult<()> {
        let now = Utc::now();
        let mut acks = Vec::with_capacity(entries.len());
        let mut invalid = Vec::new();

        for (position, entry) in entries.iter().enumerate() {
            let Some(result) = find_result(response, position, &entry.key.external_id) else {
                tracing::warn!(external_id = %entry.key.external_id, "no result for item, keeping queued");
                continue;
            };
            match result.status {
                ItemStatus::Accepted | ItemStatus::Skipped => {
                    if result.status == ItemStatus::Accepted {
                        summary.accepted += 1;
                    } else {
                        summary.skipped += 1;
                        tracing::debug!(
                            external_id = %entry.key.external_id,
                            reason = result.reason.as_deref().unwrap_or(""),
                            "server skipped item"
                        );
                    }
                    let persisted = result.status == ItemStatus::Accepted
                        || result.reason.as_deref() == Some(reasons::UNCHANGED);
                    let index = match &entry.on_success {
                        IndexUpdate::Record(indexed) if persisted => {
                            let mut indexed = indexed.clone();
                            indexed.last_synced_at = now;
                            IndexUpdate::Record(indexed)
                        }
                        // Stale: the server kept newer content, so the index
                        // keeps its hash and only stops the next scan from
                        // re-queueing this version.
                        IndexUpdate::Record(indexed) => IndexUpdate::RefreshToken {
                            external_id: indexed.external_id.clone(),
                            token: indexed.last_seen_change_token,
                        },
                        other => other.clone(),
                    };
                    acks.push(QueueAck {
                        key: entry.key.clone(),
                        token: entry.token,
                        index,
                    });
                }
                ItemStatus::Rejected => {
                    summary.rejected += 1;
                    if result.reason.as_deref() == Some(reasons::INVALID_ITEM) {
                        tracing::warn!(external_id = %entry.key.external_id, "item rejected as invalid, dropping");
                        summary.dropped += 1;
                        invalid.push(entry.key.external_id.as_str());
                        acks.push(QueueAck {
                            key: entry.key.clone(),
                            token: entry.token,
                            index: IndexUpdate::Keep,
                        });
                    } else {
                        tracing::warn!(
                            external_id = %entry.key.external_id,
                            reason = result.reason.as_deref().unwrap_or(""),
                            "item rejected, keeping queued"
                        );
                    }
                }
            }
        }

        summary.acknowledged += self.store.acknowledge(&acks)?;
        summary.remaining = self.store.pending_count()?;
        self.backoff
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .reset();
        self.store.record_success(now)?;
        if !invalid.is_empty() {
            self.record_error(
                ErrorClass::Validation,
                &format!("{} item(s) rejected as invalid: {}", invalid.len(), invalid.join(", ")),
            );
        }

        tracing::info!(
            sent = summary.sent,
            accepted = summary.accepted,
            skipped = summary.skipped,
            rejected = summary.rejected,
            remaining = summary.remaining,
            "batch delivered"
        );
        Ok(())
    }

    fn next_backoff(&self, hint: Option<Duration>) -> Duration {
        self.backoff
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .next_delay(hint)
    }

    fn record_error(&self, class: ErrorClass, message: &str) {
        if let Err(e) = self.store.record_error(class, message, Utc::now()) {
            tracing::warn!(error = %e, "could not record sync error");
        }
    }
}

fn error_text(outcome: &TransportOutcome) -> String {
    outcome
        .to_error()
        .map(|e| e.to_string())
        .unwrap_or_default()
}

/// Results are positional; fall back to a lookup by id if the server
/// reordered them.
fn find_result<'r>(
    response: &'r BatchResponse,
    position: usize,
    external_id: &str,
) -> Option<&'r ItemResult> {
    response
        .item_results
        .get(position)
        .filter(|r| r.external_id == external_id)
        .or_else(|| {
            response
                .item_results
                .iter()
                .find(|r| r.external_id == external_id)
        })
}
