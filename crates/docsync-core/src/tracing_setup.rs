//! Tracing initialization.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::ObservabilityConfig;

static INIT: Once = Once::new();

/// Initialize the global tracing subscriber.
///
/// Reads `DOCSYNC_LOG` for per-module filters, e.g.
/// `DOCSYNC_LOG=docsync_agent=debug,docsync_storage=warn`.
/// Falls back to `config.log_level` when unset or invalid.
///
/// Idempotent: only the first call installs a subscriber.
pub fn init_tracing(config: &ObservabilityConfig) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("DOCSYNC_LOG")
            .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

        if config.json_logs {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_thread_ids(true),
                )
                .with(filter)
                .init();
        } else {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .with(filter)
                .init();
        }
    });
}
