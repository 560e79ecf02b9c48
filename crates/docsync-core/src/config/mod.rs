pub mod agent_config;
pub mod defaults;
pub mod docsync_config;
pub mod observability_config;
pub mod scope_config;
pub mod server_config;
pub mod storage_config;
pub mod transport_config;

pub use agent_config::AgentConfig;
pub use docsync_config::DocSyncConfig;
pub use observability_config::ObservabilityConfig;
pub use scope_config::ScopeConfig;
pub use server_config::{ConnectionConfig, ServerConfig};
pub use storage_config::StorageConfig;
pub use transport_config::TransportConfig;
