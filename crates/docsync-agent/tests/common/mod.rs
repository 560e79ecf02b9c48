//! Test doubles shared by the agent integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::DateTime;
use tokio::sync::Notify;

use docsync_agent::{
    AgentSettings, DocumentSource, ScannedFile, SourceDocument, SyncAgent, SyncTransport,
    TransportOutcome,
};
use docsync_core::config::DocSyncConfig;
use docsync_core::errors::SourceError;
use docsync_core::models::{BatchResponse, ItemResult, SyncRequest};
use docsync_storage::StorageEngine;

// ─── Source ────────────────────────────────────────────────

/// In-memory document source with injectable read failures.
#[derive(Default)]
pub struct MemorySource {
    docs: Mutex<BTreeMap<String, (String, i64)>>,
    failing: Mutex<HashSet<String>>,
}

impl MemorySource {
    pub fn write(&self, path: &str, content: &str, token: i64) {
        self.docs
            .lock()
            .unwrap()
            .insert(path.to_string(), (content.to_string(), token));
    }

    pub fn remove(&self, path: &str) {
        self.docs.lock().unwrap().remove(path);
    }

    pub fn fail_reads(&self, path: &str) {
        self.failing.lock().unwrap().insert(path.to_string());
    }
}

impl DocumentSource for MemorySource {
    fn read(&self, path: &str) -> Result<Option<SourceDocument>, SourceError> {
        if self.failing.lock().unwrap().contains(path) {
            return Err(SourceError::ReadFailed {
                path: path.to_string(),
                reason: "injected".to_string(),
            });
        }
        Ok(self
            .docs
            .lock()
            .unwrap()
            .get(path)
            .map(|(content, token)| SourceDocument {
                path: path.to_string(),
                title: Path::new(path)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned()),
                content: content.clone(),
                change_token: *token,
                modified_at: DateTime::from_timestamp_millis(*token).unwrap(),
            }))
    }

    fn change_token(&self, path: &str) -> Result<Option<i64>, SourceError> {
        Ok(self.docs.lock().unwrap().get(path).map(|(_, token)| *token))
    }

    fn list(&self) -> Result<Vec<ScannedFile>, SourceError> {
        Ok(self
            .docs
            .lock()
            .unwrap()
            .iter()
            .map(|(path, (_, token))| ScannedFile {
                path: path.clone(),
                change_token: *token,
            })
            .collect())
    }
}

// ─── Transport ─────────────────────────────────────────────

type Reply = Box<dyn Fn(&SyncRequest) -> TransportOutcome + Send>;

#[derive(Default)]
struct Inner {
    requests: Mutex<Vec<SyncRequest>>,
    script: Mutex<VecDeque<Reply>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

/// Records every request and replies from a script. With an empty script
/// it accepts every item.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    inner: Arc<Inner>,
}

pub fn accept_all(request: &SyncRequest) -> BatchResponse {
    let mut response = BatchResponse::default();
    for item in &request.items {
        response.push(ItemResult::accepted(item.external_id()));
    }
    response
}

impl ScriptedTransport {
    pub fn push_outcome(&self, outcome: TransportOutcome) {
        self.push_with(move |_| outcome.clone());
    }

    pub fn push_with<F>(&self, reply: F)
    where
        F: Fn(&SyncRequest) -> TransportOutcome + Send + 'static,
    {
        self.inner.script.lock().unwrap().push_back(Box::new(reply));
    }

    /// Hold every send until the returned notifier fires.
    pub fn hold(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.inner.gate.lock().unwrap() = Some(Arc::clone(&notify));
        notify
    }

    pub fn requests(&self) -> Vec<SyncRequest> {
        self.inner.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.inner.requests.lock().unwrap().len()
    }
}

impl SyncTransport for ScriptedTransport {
    async fn send_batch(&self, request: &SyncRequest) -> TransportOutcome {
        self.inner.requests.lock().unwrap().push(request.clone());
        let gate = self.inner.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let reply = self.inner.script.lock().unwrap().pop_front();
        match reply {
            Some(reply) => reply(request),
            None => TransportOutcome::Delivered(accept_all(request)),
        }
    }
}

// ─── Agent ─────────────────────────────────────────────────

pub type TestAgent<S = MemorySource> = SyncAgent<S, ScriptedTransport>;

pub fn settings_with<F: FnOnce(&mut DocSyncConfig)>(edit: F) -> AgentSettings {
    let mut config = DocSyncConfig::default();
    edit(&mut config);
    AgentSettings::from_config(config).unwrap()
}

pub fn memory_agent() -> TestAgent {
    memory_agent_with(|_| {})
}

pub fn memory_agent_with<F: FnOnce(&mut DocSyncConfig)>(edit: F) -> TestAgent {
    SyncAgent::new(
        settings_with(edit),
        Arc::new(StorageEngine::open_in_memory().unwrap()),
        MemorySource::default(),
        ScriptedTransport::default(),
    )
}

/// Poll `cond` until it holds or two seconds pass.
pub async fn eventually<F: Fn() -> bool>(cond: F) -> bool {
    for _ in 0..400 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}
