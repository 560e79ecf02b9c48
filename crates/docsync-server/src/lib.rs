//! # docsync-server
//!
//! The receiving side of the sync engine. Accepts batches over HTTP, runs
//! each item through the conflict resolver inside its own transaction, and
//! answers with per-item results.

pub mod pipeline;
pub mod registry;
pub mod routes;
pub mod server;

pub use pipeline::IngestionPipeline;
pub use registry::ScopeRegistry;
pub use routes::{router, AppState, HEALTH_PATH};
pub use server::IngestServer;
