//! Store and entry operations.
//!
//! Each named store maps a request identity to one immutable response.
//! Replacing an entry deletes the old row and inserts a new one, so the
//! row's `seq` always reflects when the current response was written.

use super::connection::StoreRegistry;
use crate::Error;
use crate::model::{CachedEntry, RequestIdentity, Response};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

fn ensure_store(conn: &rusqlite::Connection, name: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)",
        params![name, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn insert_entry(
    conn: &rusqlite::Connection, store: &str, identity: &RequestIdentity, response: &Response, cached_at: &str,
) -> Result<(), Error> {
    let key_hash = identity.key_hash();
    let headers_json =
        serde_json::to_string(&response.headers).map_err(|e| Error::InvalidInput(format!("headers: {e}")))?;

    conn.execute("DELETE FROM entries WHERE store = ?1 AND key_hash = ?2", params![store, key_hash])?;
    conn.execute(
        "INSERT INTO entries (store, key_hash, method, url, status, headers_json, body, cached_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            store,
            key_hash,
            identity.method,
            identity.url.as_str(),
            response.status,
            headers_json,
            response.body,
            cached_at,
        ],
    )?;
    Ok(())
}

fn read_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<CachedEntry> {
    let store: String = row.get(0)?;
    let url: String = row.get(3)?;
    let headers_json: String = row.get(5)?;
    let headers = serde_json::from_str(&headers_json).unwrap_or_else(|e| {
        tracing::warn!(%store, %url, "dropping unreadable cached headers: {e}");
        Vec::new()
    });

    Ok(CachedEntry {
        key_hash: row.get(1)?,
        method: row.get(2)?,
        response: Response { status: row.get(4)?, headers, body: row.get(6)? },
        cached_at: row.get(7)?,
        store,
        url,
    })
}

impl StoreRegistry {
    /// Create the named store if it does not exist yet.
    pub async fn open_store(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> { ensure_store(conn, &name) })
            .await
            .map_err(Error::from)
    }

    /// Write `response` under `identity`, replacing any previous entry.
    ///
    /// The store is created on first use.
    pub async fn put(&self, store: &str, identity: &RequestIdentity, response: &Response) -> Result<(), Error> {
        let store = store.to_string();
        let identity = identity.clone();
        let response = response.clone();
        let cached_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                ensure_store(&tx, &store)?;
                insert_entry(&tx, &store, &identity, &response, &cached_at)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Like [`put`](Self::put), but never creates the store.
    ///
    /// Returns `false` without writing when the store has been deleted,
    /// so late writers cannot resurrect a retired generation.
    pub async fn put_if_store_exists(
        &self, store: &str, identity: &RequestIdentity, response: &Response,
    ) -> Result<bool, Error> {
        let store = store.to_string();
        let identity = identity.clone();
        let response = response.clone();
        let cached_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                let exists: bool =
                    tx.query_row("SELECT EXISTS(SELECT 1 FROM stores WHERE name = ?1)", params![store], |row| {
                        row.get(0)
                    })?;
                if !exists {
                    return Ok(false);
                }
                insert_entry(&tx, &store, &identity, &response, &cached_at)?;
                tx.commit()?;
                Ok(true)
            })
            .await
            .map_err(Error::from)
    }

    /// Replace the whole content of `store` with `entries` in one transaction.
    ///
    /// Either every entry lands or the store is left as it was.
    pub async fn populate(&self, store: &str, entries: Vec<(RequestIdentity, Response)>) -> Result<usize, Error> {
        let store = store.to_string();
        let cached_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM stores WHERE name = ?1", params![store])?;
                ensure_store(&tx, &store)?;
                for (identity, response) in &entries {
                    insert_entry(&tx, &store, identity, response, &cached_at)?;
                }
                tx.commit()?;
                Ok(entries.len())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the entry for `identity` in a single store.
    pub async fn match_entry(&self, store: &str, identity: &RequestIdentity) -> Result<Option<CachedEntry>, Error> {
        self.match_any(&[store.to_string()], identity).await
    }

    /// Look up `identity` across `stores`, returning the first hit in the given order.
    pub async fn match_any(&self, stores: &[String], identity: &RequestIdentity) -> Result<Option<CachedEntry>, Error> {
        let stores = stores.to_vec();
        let key_hash = identity.key_hash();
        self.conn
            .call(move |conn| -> Result<Option<CachedEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT store, key_hash, method, url, status, headers_json, body, cached_at
                     FROM entries WHERE store = ?1 AND key_hash = ?2",
                )?;

                for store in &stores {
                    if let Some(entry) = stmt.query_row(params![store, key_hash], read_entry).optional()? {
                        return Ok(Some(entry));
                    }
                }

                Ok(None)
            })
            .await
            .map_err(Error::from)
    }

    /// Remove the entry for `identity`. Returns whether one existed.
    pub async fn delete(&self, store: &str, identity: &RequestIdentity) -> Result<bool, Error> {
        let store = store.to_string();
        let key_hash = identity.key_hash();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count =
                    conn.execute("DELETE FROM entries WHERE store = ?1 AND key_hash = ?2", params![store, key_hash])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Request identities in `store`, oldest write first.
    ///
    /// Rows whose URL no longer parses are skipped.
    pub async fn keys(&self, store: &str) -> Result<Vec<RequestIdentity>, Error> {
        let store = store.to_string();
        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<(String, String)>, Error> {
                let mut stmt = conn.prepare("SELECT method, url FROM entries WHERE store = ?1 ORDER BY seq ASC")?;
                let rows = stmt
                    .query_map(params![store], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        Ok(rows
            .into_iter()
            .filter_map(|(method, url)| match url::Url::parse(&url) {
                Ok(url) => Some(RequestIdentity::new(&method, url)),
                Err(e) => {
                    tracing::warn!(%url, "skipping cached key with unparseable url: {e}");
                    None
                }
            })
            .collect())
    }

    /// Number of entries in `store`.
    pub async fn count(&self, store: &str) -> Result<usize, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE store = ?1", params![store], |row| row.get(0))?;
                Ok(count as usize)
            })
            .await
            .map_err(Error::from)
    }

    /// Names of every store, in creation order.
    pub async fn store_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Drop a store and all of its entries. Returns whether it existed.
    pub async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM stores WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn identity(path: &str) -> RequestIdentity {
        RequestIdentity::new("GET", Url::parse(&format!("https://example.com{path}")).unwrap())
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let registry = StoreRegistry::open_in_memory().await.unwrap();
        let response = Response::plain(200, "body { color: red }");

        registry.put("app-static-v1", &identity("/styles.css"), &response).await.unwrap();

        let entry = registry
            .match_entry("app-static-v1", &identity("/styles.css"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.response, response);
        assert_eq!(entry.method, "GET");
        assert_eq!(entry.url, "https://example.com/styles.css");
    }

    #[tokio::test]
    async fn test_match_missing() {
        let registry = StoreRegistry::open_in_memory().await.unwrap();
        let result = registry.match_entry("app-static-v1", &identity("/nope")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_match_any_respects_order() {
        let registry = StoreRegistry::open_in_memory().await.unwrap();
        registry.put("a", &identity("/x"), &Response::plain(200, "from a")).await.unwrap();
        registry.put("b", &identity("/x"), &Response::plain(200, "from b")).await.unwrap();

        let stores = vec!["b".to_string(), "a".to_string()];
        let entry = registry.match_any(&stores, &identity("/x")).await.unwrap().unwrap();
        assert_eq!(entry.store, "b");
        assert_eq!(entry.response.body, b"from b");
    }

    #[tokio::test]
    async fn test_replace_moves_key_to_end() {
        let registry = StoreRegistry::open_in_memory().await.unwrap();
        registry.put("dyn", &identity("/a"), &Response::plain(200, "a1")).await.unwrap();
        registry.put("dyn", &identity("/b"), &Response::plain(200, "b")).await.unwrap();
        registry.put("dyn", &identity("/a"), &Response::plain(200, "a2")).await.unwrap();

        let keys = registry.keys("dyn").await.unwrap();
        let paths: Vec<&str> = keys.iter().map(|k| k.url.path()).collect();
        assert_eq!(paths, vec!["/b", "/a"]);

        let entry = registry.match_entry("dyn", &identity("/a")).await.unwrap().unwrap();
        assert_eq!(entry.response.body, b"a2");
        assert_eq!(registry.count("dyn").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_entry() {
        let registry = StoreRegistry::open_in_memory().await.unwrap();
        registry.put("dyn", &identity("/a"), &Response::plain(200, "a")).await.unwrap();

        assert!(registry.delete("dyn", &identity("/a")).await.unwrap());
        assert!(!registry.delete("dyn", &identity("/a")).await.unwrap());
        assert!(registry.match_entry("dyn", &identity("/a")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_store_cascades() {
        let registry = StoreRegistry::open_in_memory().await.unwrap();
        registry.put("old", &identity("/a"), &Response::plain(200, "a")).await.unwrap();
        registry.open_store("new").await.unwrap();

        assert!(registry.delete_store("old").await.unwrap());
        assert_eq!(registry.store_names().await.unwrap(), vec!["new".to_string()]);
        assert_eq!(registry.count("old").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_open_store_idempotent() {
        let registry = StoreRegistry::open_in_memory().await.unwrap();
        registry.open_store("s").await.unwrap();
        registry.open_store("s").await.unwrap();
        assert_eq!(registry.store_names().await.unwrap(), vec!["s".to_string()]);
    }

    #[tokio::test]
    async fn test_put_if_store_exists() {
        let registry = StoreRegistry::open_in_memory().await.unwrap();
        let written = registry
            .put_if_store_exists("gone", &identity("/a"), &Response::plain(200, "a"))
            .await
            .unwrap();
        assert!(!written);
        assert!(registry.store_names().await.unwrap().is_empty());

        registry.open_store("live").await.unwrap();
        assert!(
            registry
                .put_if_store_exists("live", &identity("/a"), &Response::plain(200, "a"))
                .await
                .unwrap()
        );
        assert_eq!(registry.count("live").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_populate_replaces_store() {
        let registry = StoreRegistry::open_in_memory().await.unwrap();
        registry.put("static", &identity("/stale"), &Response::plain(200, "x")).await.unwrap();

        let written = registry
            .populate(
                "static",
                vec![
                    (identity("/"), Response::plain(200, "root")),
                    (identity("/index.html"), Response::plain(200, "index")),
                ],
            )
            .await
            .unwrap();

        assert_eq!(written, 2);
        assert!(registry.match_entry("static", &identity("/stale")).await.unwrap().is_none());
        assert_eq!(registry.count("static").await.unwrap(), 2);
    }
}
