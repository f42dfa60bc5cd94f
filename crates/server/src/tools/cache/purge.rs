//! cache_purge tool implementation.
//!
//! Trims the active dynamic store, oldest entries first.

use offcache_client::Worker;
use offcache_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Keep only the newest N entries (default: the configured ceiling).
    #[serde(default)]
    pub max_entries: Option<usize>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    pub store: String,
    /// Number of entries deleted.
    pub deleted: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(worker: &Worker, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    let (store, deleted) = worker.purge(params.max_entries).await?;

    let output = CachePurgeOutput { store, deleted };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{deployed_worker, output, worker};
    use offcache_core::InterceptRequest;
    use url::Url;

    #[tokio::test]
    async fn test_purge_fifo() {
        let (worker, network) = deployed_worker().await;
        for page in ["/a", "/b", "/c"] {
            network.serve(page, page);
            let url = Url::parse("https://app.example").unwrap().join(page).unwrap();
            worker.intercept(InterceptRequest::get(url)).await;
        }

        let params = CachePurgeParams { max_entries: Some(1) };
        let out: CachePurgeOutput = output(&purge_impl(&worker, params).await.unwrap());
        assert_eq!(out.store, "app-dynamic-v1");
        assert_eq!(out.deleted, 2);

        let keys = worker.registry().keys("app-dynamic-v1").await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].url.path(), "/c");
    }

    #[tokio::test]
    async fn test_purge_default_ceiling() {
        let (worker, _network) = deployed_worker().await;
        let out: CachePurgeOutput = output(&purge_impl(&worker, CachePurgeParams::default()).await.unwrap());
        assert_eq!(out.deleted, 0);
    }

    #[tokio::test]
    async fn test_purge_no_generation() {
        let (worker, _network) = worker().await;
        assert!(purge_impl(&worker, CachePurgeParams::default()).await.is_err());
    }
}
