pub mod document;
pub mod protocol;
pub mod queue;
pub mod status;
pub mod sync_item;

pub use document::{DocumentSnapshot, DocumentWrite, StoredDocument, SyncCursor};
pub use protocol::{
    BatchResponse, ErrorResponse, ItemResult, ItemStatus, SyncRequest, PROTOCOL_HEADER,
    PROTOCOL_VERSION, SYNC_BATCHES_PATH,
};
pub use queue::{IndexUpdate, LocalIndexEntry, NewPendingOp, PendingOp, PendingOpKind, QueueAck, QueueKey};
pub use status::{ErrorClass, SyncStatusReport};
pub use sync_item::{DeleteItem, Metadata, SyncItem, UpsertItem};
