//! Bounded-size enforcement for a store.
//!
//! Eviction is FIFO by write order: the entries written longest ago go
//! first, regardless of how recently they were read or how large they are.

use super::connection::StoreRegistry;
use crate::Error;
use tokio_rusqlite::params;

/// Default ceiling for the dynamic store.
pub const DEFAULT_MAX_ENTRIES: usize = 50;

impl StoreRegistry {
    /// Delete the oldest entries of `store` until at most `max_entries` remain.
    ///
    /// Returns the number of deleted entries.
    pub async fn enforce_limit(&self, store: &str, max_entries: usize) -> Result<u64, Error> {
        let store = store.to_string();
        let max = max_entries as i64;
        let deleted = self
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let tx = conn.transaction()?;
                let count: i64 =
                    tx.query_row("SELECT COUNT(*) FROM entries WHERE store = ?1", params![store], |row| row.get(0))?;
                if count <= max {
                    return Ok(0);
                }

                let to_delete = count - max;
                let deleted = tx.execute(
                    "DELETE FROM entries WHERE seq IN (
                        SELECT seq FROM entries WHERE store = ?1 ORDER BY seq ASC LIMIT ?2
                    )",
                    params![store, to_delete],
                )?;
                tx.commit()?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)?;

        if deleted > 0 {
            tracing::debug!(deleted, max_entries, "evicted oldest entries");
        }
        Ok(deleted)
    }
}
