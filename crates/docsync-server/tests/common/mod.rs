//! Shared helpers for the server tests: a fault-injecting store and a
//! server bound to an ephemeral port.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use docsync_core::config::{ConnectionConfig, DocSyncConfig};
use docsync_core::errors::DocSyncResult;
use docsync_core::models::{DocumentSnapshot, StoredDocument, SyncCursor};
use docsync_core::traits::{DocumentDecision, IDocumentStore};
use docsync_server::IngestServer;
use docsync_storage::{to_storage_err, StorageEngine};

pub const SCOPE: &str = "vault";
pub const TOKEN: &str = "secret-token";

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_704_067_200 + secs, 0).unwrap()
}

// ─── Fault injection ──────────────────────────────────────

/// Delegates to an in-memory engine, with optional failures and a gate
/// that holds the first commit until released.
pub struct FaultyStore {
    pub inner: StorageEngine,
    fail_commit_for: Mutex<Option<String>>,
    fail_cursor: AtomicBool,
    gate: Mutex<Option<mpsc::Receiver<()>>>,
    pub entered: AtomicBool,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self {
            inner: StorageEngine::open_in_memory().unwrap(),
            fail_commit_for: Mutex::new(None),
            fail_cursor: AtomicBool::new(false),
            gate: Mutex::new(None),
            entered: AtomicBool::new(false),
        }
    }

    pub fn fail_commit_for(&self, external_id: &str) {
        *self.fail_commit_for.lock().unwrap() = Some(external_id.to_string());
    }

    pub fn fail_cursor(&self) {
        self.fail_cursor.store(true, Ordering::SeqCst);
    }

    /// Block the next commit until the returned sender fires.
    pub fn hold(&self) -> mpsc::Sender<()> {
        let (tx, rx) = mpsc::channel();
        *self.gate.lock().unwrap() = Some(rx);
        tx
    }
}

impl IDocumentStore for FaultyStore {
    fn commit_document<'a>(
        &self,
        scope_id: &str,
        external_id: &str,
        decide: &mut DocumentDecision<'_, 'a>,
    ) -> DocSyncResult<()> {
        self.entered.store(true, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.recv();
        }
        if self.fail_commit_for.lock().unwrap().as_deref() == Some(external_id) {
            return Err(to_storage_err("injected commit failure".into()));
        }
        self.inner.commit_document(scope_id, external_id, decide)
    }

    fn get_snapshot(&self, scope_id: &str, external_id: &str) -> DocSyncResult<Option<DocumentSnapshot>> {
        self.inner.get_snapshot(scope_id, external_id)
    }

    fn get_document(&self, scope_id: &str, external_id: &str) -> DocSyncResult<Option<StoredDocument>> {
        self.inner.get_document(scope_id, external_id)
    }

    fn list_live_documents(&self, scope_id: &str, limit: usize) -> DocSyncResult<Vec<StoredDocument>> {
        self.inner.list_live_documents(scope_id, limit)
    }

    fn advance_cursor(&self, scope_id: &str, to: DateTime<Utc>) -> DocSyncResult<SyncCursor> {
        if self.fail_cursor.load(Ordering::SeqCst) {
            return Err(to_storage_err("injected cursor failure".into()));
        }
        self.inner.advance_cursor(scope_id, to)
    }

    fn get_cursor(&self, scope_id: &str) -> DocSyncResult<Option<SyncCursor>> {
        self.inner.get_cursor(scope_id)
    }
}

// ─── Running server ───────────────────────────────────────

pub fn server_config() -> DocSyncConfig {
    let mut config = DocSyncConfig::default();
    config.server.bind_addr = "127.0.0.1:0".into();
    config.server.connections = vec![
        ConnectionConfig {
            scope_id: SCOPE.into(),
            name: Some("Test vault".into()),
            token: TOKEN.into(),
        },
        ConnectionConfig {
            scope_id: "other".into(),
            name: None,
            token: "other-token".into(),
        },
    ];
    config
}

pub struct RunningServer {
    pub base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<std::io::Result<()>>>,
}

impl RunningServer {
    pub async fn start(config: &DocSyncConfig, store: Arc<dyn IDocumentStore>) -> Self {
        let server = IngestServer::new(config, store);
        let listener = server.bind().await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(server.serve(listener, async {
            rx.await.ok();
        }));
        Self {
            base_url,
            shutdown: Some(tx),
            task: Some(task),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.await.unwrap().unwrap();
        }
    }
}
