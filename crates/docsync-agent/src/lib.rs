//! # docsync-agent
//!
//! The client side of the sync engine. Watches a document source, records
//! sync intents in a durable queue, and delivers them to the ingestion server
//! in bounded batches with single-flight flushes and backoff.
//!
//! ```text
//! change event ─► ChangeTracker ─► pending_ops
//!                                      │  (debounce / periodic / startup)
//!                                      ▼
//!                 SyncAgent::flush ─► BatchBuilder ─► SyncTransport
//!                                      ▲                   │
//!                     acknowledge ◄────┴──── BatchResponse ◄┘
//! ```

pub mod backoff;
pub mod batch;
pub mod diff;
pub mod engine;
pub mod scheduler;
pub mod settings;
pub mod source;
pub mod tracker;
pub mod transport;

pub use engine::{FlushOutcome, FlushSummary, SyncAgent};
pub use scheduler::{SchedulerHandle, SyncScheduler};
pub use settings::AgentSettings;
pub use source::{DocumentSource, ScannedFile, SourceDocument, VaultSource};
pub use transport::{
    CredentialStore, HttpTransport, StaticCredentials, SyncTransport, TransportOutcome,
};
