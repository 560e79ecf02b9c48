//! Server assembly: storage, registry, router and listener.

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use docsync_core::config::DocSyncConfig;
use docsync_core::errors::DocSyncResult;
use docsync_core::traits::IDocumentStore;
use docsync_storage::StorageEngine;

use crate::pipeline::IngestionPipeline;
use crate::registry::ScopeRegistry;
use crate::routes::{router, AppState};

pub struct IngestServer {
    router: Router,
    bind_addr: String,
}

impl IngestServer {
    /// Build a server over an existing document store.
    pub fn new(config: &DocSyncConfig, store: Arc<dyn IDocumentStore>) -> Self {
        let registry = ScopeRegistry::from_config(&config.server.connections);
        if registry.is_empty() {
            tracing::warn!("no connections registered, every batch will be refused");
        }
        let state = AppState::new(IngestionPipeline::new(store), registry, &config.server);
        Self {
            router: router(state, config.server.max_body_bytes),
            bind_addr: config.server.bind_addr.clone(),
        }
    }

    /// Open the SQLite store at `storage.db_path` and build a server on it.
    pub fn open(config: &DocSyncConfig) -> DocSyncResult<Self> {
        let engine = StorageEngine::open_with_config(Path::new(&config.storage.db_path), &config.storage)?;
        Ok(Self::new(config, Arc::new(engine)))
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn bind(&self) -> std::io::Result<TcpListener> {
        TcpListener::bind(&self.bind_addr).await
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: Option<SocketAddr> = listener.local_addr().ok();
        tracing::info!(addr = ?addr, "ingestion server listening");
        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;
        tracing::info!("ingestion server stopped");
        Ok(())
    }
}
