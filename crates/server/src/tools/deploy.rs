//! cache_deploy tool implementation.
//!
//! Installs a generation's static manifest and activates it immediately.

use offcache_client::Worker;
use offcache_core::{Error, Generation};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_deploy tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeployParams {
    /// Generation number to deploy. Defaults to one past the active generation.
    #[serde(default)]
    pub generation: Option<u32>,
}

/// Output from the cache_deploy tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeployOutput {
    pub generation: Generation,
    pub static_store: String,
    pub dynamic_store: String,
    /// Stores removed during activation.
    pub deleted_stores: Vec<String>,
    /// Dynamic entries evicted to stay under the ceiling.
    pub evicted: u64,
}

/// Implementation of the cache_deploy tool.
pub async fn deploy_impl(worker: &Worker, params: CacheDeployParams) -> Result<CallToolResult, McpError> {
    let app_id = worker.config().app_id.clone();
    let number = match (params.generation, worker.active_generation().await) {
        (Some(0), _) => return Err(Error::InvalidInput("generation must be at least 1".into()).into()),
        (Some(number), _) => number,
        (None, Some(active)) => active.number.saturating_add(1),
        (None, None) => worker.config().generation,
    };

    let report = worker.deploy(Generation::new(app_id, number)).await?;

    let output = CacheDeployOutput {
        static_store: report.generation.static_store(),
        dynamic_store: report.generation.dynamic_store(),
        generation: report.generation,
        deleted_stores: report.deleted_stores,
        evicted: report.evicted,
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
