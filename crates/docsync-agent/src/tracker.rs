//! Local change tracking: turns source events into durable queue intents.
//!
//! Nothing here touches the local index. The index only moves when the
//! server acknowledges a batch.

use chrono::Utc;

use docsync_core::build_external_id;
use docsync_core::content::normalize_path;
use docsync_core::errors::DocSyncResult;
use docsync_core::models::{NewPendingOp, QueueKey};
use docsync_core::traits::IAgentStateStore;

use crate::diff::{compute_scan_diff, ScanDiff};
use crate::settings::AgentSettings;
use crate::source::DocumentSource;

/// Borrowed view over the agent's store, source and current settings.
pub struct ChangeTracker<'a> {
    store: &'a dyn IAgentStateStore,
    source: &'a dyn DocumentSource,
    settings: &'a AgentSettings,
}

pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl<'a> ChangeTracker<'a> {
    pub fn new(
        store: &'a dyn IAgentStateStore,
        source: &'a dyn DocumentSource,
        settings: &'a AgentSettings,
    ) -> Self {
        Self {
            store,
            source,
            settings,
        }
    }

    fn upsert_op(&self, path: &str) -> NewPendingOp {
        let token = match self.source.change_token(path) {
            Ok(Some(token)) => token,
            Ok(None) => now_millis(),
            Err(e) => {
                tracing::warn!(path, error = %e, "could not stat document, using current time");
                now_millis()
            }
        };
        NewPendingOp {
            key: QueueKey::upsert(build_external_id(self.settings.scope_id(), path), path),
            change_token: token,
        }
    }

    fn delete_op(&self, path: &str, observed_at: i64) -> NewPendingOp {
        NewPendingOp {
            key: QueueKey::delete(build_external_id(self.settings.scope_id(), path), path),
            change_token: observed_at,
        }
    }

    /// A document was created or modified. Content is read at flush time.
    /// Returns whether an intent was queued.
    pub fn on_change(&self, path: &str) -> DocSyncResult<bool> {
        let path = normalize_path(path);
        if !self.settings.scope().is_included(&path) {
            return Ok(false);
        }
        self.store.enqueue(&[self.upsert_op(&path)])?;
        tracing::trace!(path, "upsert queued");
        Ok(true)
    }

    pub fn on_create(&self, path: &str) -> DocSyncResult<bool> {
        self.on_change(path)
    }

    pub fn on_modify(&self, path: &str) -> DocSyncResult<bool> {
        self.on_change(path)
    }

    /// Queue a delete stamped with the observation time.
    pub fn on_delete(&self, path: &str) -> DocSyncResult<bool> {
        let path = normalize_path(path);
        if !self.settings.scope().is_included(&path) {
            return Ok(false);
        }
        self.store.enqueue(&[self.delete_op(&path, now_millis())])?;
        tracing::trace!(path, "delete queued");
        Ok(true)
    }

    /// delete(old) then upsert(new), persisted in one transaction. Either side
    /// is dropped if it is out of scope (a move out of the vault scope is a
    /// delete, a move in is a create).
    pub fn on_rename(&self, old_path: &str, new_path: &str) -> DocSyncResult<usize> {
        let old_path = normalize_path(old_path);
        let new_path = normalize_path(new_path);
        let mut ops = Vec::with_capacity(2);
        if self.settings.scope().is_included(&old_path) {
            ops.push(self.delete_op(&old_path, now_millis()));
        }
        if self.settings.scope().is_included(&new_path) {
            ops.push(self.upsert_op(&new_path));
        }
        self.store.enqueue(&ops)?;
        Ok(ops.len())
    }

    /// Enumerate the source and queue whatever the index says the server is
    /// missing. This is the authoritative way to detect deletes that happened
    /// while no events were observed.
    pub fn full_scan(&self) -> DocSyncResult<ScanDiff> {
        let files: Vec<_> = self
            .source
            .list()?
            .into_iter()
            .filter(|file| self.settings.scope().is_included(&file.path))
            .collect();
        let index = self.store.index_entries()?;
        let diff = compute_scan_diff(self.settings.scope_id(), &files, &index);

        let observed_at = now_millis();
        let ops: Vec<NewPendingOp> = diff
            .to_delete
            .iter()
            .map(|entry| NewPendingOp {
                key: QueueKey::delete(entry.external_id.clone(), entry.path.clone()),
                change_token: observed_at,
            })
            .chain(diff.to_upsert.iter().map(|file| NewPendingOp {
                key: QueueKey::upsert(
                    build_external_id(self.settings.scope_id(), &file.path),
                    file.path.clone(),
                ),
                change_token: file.change_token,
            }))
            .collect();
        self.store.enqueue(&ops)?;

        tracing::info!(
            upserts = diff.to_upsert.len(),
            deletes = diff.to_delete.len(),
            unchanged = diff.unchanged,
            "full scan complete"
        );
        Ok(diff)
    }
}
