//! cache_keys tool implementation.
//!
//! Lists stores, or the keys of one store in insertion order.

use offcache_client::Worker;
use offcache_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_keys tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysParams {
    /// Store whose keys to list. Omit to list stores only.
    #[serde(default)]
    pub store: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoreSummary {
    pub name: String,
    pub entries: usize,
}

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysOutput {
    /// Active generation, e.g. `app-v3`.
    pub active_generation: Option<String>,
    pub stores: Vec<StoreSummary>,
    /// `METHOD url`, oldest first. Present only when a store was named.
    pub keys: Option<Vec<String>>,
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl(worker: &Worker, params: CacheKeysParams) -> Result<CallToolResult, McpError> {
    let registry = worker.registry();

    let mut stores = Vec::new();
    for name in registry.store_names().await? {
        let entries = registry.count(&name).await?;
        stores.push(StoreSummary { name, entries });
    }

    let keys = match params.store {
        Some(store) => {
            if !stores.iter().any(|s| s.name == store) {
                return Err(Error::CacheMiss(format!("no store named {store}")).into());
            }
            let keys = registry.keys(&store).await?;
            Some(keys.iter().map(ToString::to_string).collect())
        }
        None => None,
    };

    let output = CacheKeysOutput {
        active_generation: worker.active_generation().await.map(|g| g.to_string()),
        stores,
        keys,
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{deployed_worker, output};

    #[tokio::test]
    async fn test_keys_lists_stores() {
        let (worker, _network) = deployed_worker().await;

        let out: CacheKeysOutput = output(&keys_impl(&worker, CacheKeysParams::default()).await.unwrap());
        assert_eq!(out.active_generation.as_deref(), Some("app-v1"));
        assert!(out.keys.is_none());

        let static_store = out.stores.iter().find(|s| s.name == "app-static-v1").unwrap();
        assert_eq!(static_store.entries, 3);
        assert!(out.stores.iter().any(|s| s.name == "app-dynamic-v1" && s.entries == 0));
    }

    #[tokio::test]
    async fn test_keys_in_insertion_order() {
        let (worker, _network) = deployed_worker().await;

        let params = CacheKeysParams { store: Some("app-static-v1".into()) };
        let out: CacheKeysOutput = output(&keys_impl(&worker, params).await.unwrap());
        assert_eq!(
            out.keys.unwrap(),
            vec![
                "GET https://app.example/",
                "GET https://app.example/styles.css",
                "GET https://app.example/offline.html",
            ]
        );
    }

    #[tokio::test]
    async fn test_keys_unknown_store() {
        let (worker, _network) = deployed_worker().await;
        let params = CacheKeysParams { store: Some("nope".into()) };
        assert!(keys_impl(&worker, params).await.is_err());
    }
}
