pub mod agent_store;
pub mod document_store;

pub use agent_store::IAgentStateStore;
pub use document_store::{DocumentDecision, IDocumentStore};
