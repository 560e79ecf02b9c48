//! Connection pool managing read/write connections.

pub mod pragmas;
pub mod read_pool;
pub mod write_connection;

use std::path::{Path, PathBuf};

use docsync_core::config::StorageConfig;
use docsync_core::errors::DocSyncResult;

use crate::migrations;

pub use read_pool::ReadPool;
pub use write_connection::WriteConnection;

/// The single write connection and, for file-backed databases, a read pool.
pub struct ConnectionPool {
    pub writer: WriteConnection,
    /// `None` in memory: separate in-memory connections would be separate
    /// databases, so reads go through the writer.
    pub readers: Option<ReadPool>,
    pub db_path: Option<PathBuf>,
}

impl ConnectionPool {
    /// Open the writer, bring the schema up to date, then open the readers.
    pub fn open(path: &Path, config: &StorageConfig) -> DocSyncResult<Self> {
        let writer = WriteConnection::open(path, config.busy_timeout_ms)?;
        if !writer.with_conn_sync(pragmas::verify_wal_mode)? {
            tracing::warn!(path = %path.display(), "WAL mode unavailable, readers may block on writes");
        }
        writer.with_conn_sync(|conn| migrations::run_migrations(conn).map(|_| ()))?;
        let readers = ReadPool::open(path, config.read_pool_size, config.busy_timeout_ms)?;
        tracing::debug!(path = %path.display(), readers = readers.size(), "connection pool open");
        Ok(Self {
            writer,
            readers: Some(readers),
            db_path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> DocSyncResult<Self> {
        let writer = WriteConnection::open_in_memory()?;
        writer.with_conn_sync(|conn| migrations::run_migrations(conn).map(|_| ()))?;
        Ok(Self {
            writer,
            readers: None,
            db_path: None,
        })
    }
}
