//! cache_get tool implementation.
//!
//! Looks up a stored response by request identity.

use offcache_client::Worker;
use offcache_client::fetch::canonicalize;
use offcache_core::{Error, RequestIdentity};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL, or a path relative to the application origin.
    pub url: String,

    /// HTTP method of the stored request (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Store to search. Defaults to the active generation's stores.
    #[serde(default)]
    pub store: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub store: String,
    pub key_hash: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
    pub cached_at: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(worker: &Worker, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let origin = worker
        .config()
        .origin_url()
        .map_err(|e| Error::InvalidInput(e.to_string()))?;
    let url = canonicalize(&params.url, &origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let identity = RequestIdentity::new(&params.method, url);

    let stores = match params.store {
        Some(store) => vec![store],
        None => match worker.active_generation().await {
            Some(generation) => generation.store_names().to_vec(),
            None => return Err(Error::CacheMiss("no active generation".into()).into()),
        },
    };

    let entry = worker
        .registry()
        .match_any(&stores, &identity)
        .await?
        .ok_or_else(|| Error::CacheMiss(identity.to_string()))?;

    let output = CacheGetOutput {
        store: entry.store,
        key_hash: entry.key_hash,
        method: entry.method,
        url: entry.url,
        status: entry.response.status,
        body: String::from_utf8_lossy(&entry.response.body).into_owned(),
        headers: entry.response.headers,
        cached_at: entry.cached_at,
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize entry: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{deployed_worker, output, worker};

    fn params(url: &str, store: Option<&str>) -> CacheGetParams {
        CacheGetParams { url: url.into(), method: default_method(), store: store.map(String::from) }
    }

    #[tokio::test]
    async fn test_get_impl_found() {
        let (worker, _network) = deployed_worker().await;

        let result = get_impl(&worker, params("/styles.css", None)).await.unwrap();
        let out: CacheGetOutput = output(&result);
        assert_eq!(out.store, "app-static-v1");
        assert_eq!(out.body, "body {}");
        assert_eq!(out.status, 200);
    }

    #[tokio::test]
    async fn test_get_impl_named_store() {
        let (worker, _network) = deployed_worker().await;
        let result = get_impl(&worker, params("/styles.css", Some("app-dynamic-v1"))).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_get_impl_missing() {
        let (worker, _network) = deployed_worker().await;
        let result = get_impl(&worker, params("/nonexistent", None)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_get_impl_no_generation() {
        let (worker, _network) = worker().await;
        let result = get_impl(&worker, params("/styles.css", None)).await;
        assert!(result.is_err());
    }
}
