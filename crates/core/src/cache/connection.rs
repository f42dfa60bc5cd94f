//! Database connection management with pragma configuration.
//!
//! Opens the SQLite database backing every named store, applies the
//! pragmas needed for concurrent access (WAL mode, cascading deletes),
//! and runs migrations.

use super::migrations;
use crate::Error;
use std::path::Path;
use tokio_rusqlite::Connection;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

/// Handle to the persistent store registry.
///
/// Wraps a tokio-rusqlite Connection that runs statements on a background
/// thread; clones share the same connection, so concurrent requests
/// serialize at the statement level and the last write to a key wins.
#[derive(Clone, Debug)]
pub struct StoreRegistry {
    pub(crate) conn: Connection,
}

impl StoreRegistry {
    /// Open a registry at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies pragmas,
    /// and runs any pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::MigrationFailed(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let conn = Connection::open(path).await.map_err(|e| Error::StorageUnavailable(e.into()))?;
        Self::prepare(conn).await
    }

    /// Open an in-memory registry for testing.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::StorageUnavailable(e.into()))?;
        Self::prepare(conn).await
    }

    async fn prepare(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(PRAGMAS)?;
            Ok(())
        })
        .await
        .map_err(Error::StorageUnavailable)?;

        migrations::run(&conn).await?;

        Ok(Self { conn })
    }
}
