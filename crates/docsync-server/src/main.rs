use std::path::PathBuf;

use anyhow::Context;

use docsync_core::tracing_setup::init_tracing;
use docsync_core::DocSyncConfig;
use docsync_server::IngestServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => DocSyncConfig::load(&path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => {
            let mut config = DocSyncConfig::default();
            config.apply_overrides_from(|key| std::env::var(key).ok());
            config.validate()?;
            config
        }
    };
    init_tracing(&config.observability);

    let server = IngestServer::open(&config).context("opening document store")?;
    let listener = server
        .bind()
        .await
        .with_context(|| format!("binding {}", config.server.bind_addr))?;

    server
        .serve(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "could not listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await?;
    Ok(())
}
