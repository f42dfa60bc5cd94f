//! cache_fetch tool implementation.
//!
//! Sends a request through the intercepting layer, exactly as the
//! application would, and reports where the response came from.

use std::collections::BTreeMap;

use offcache_client::Worker;
use offcache_client::fetch::canonicalize;
use offcache_core::{Error, InterceptRequest, ResponseSource};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheFetchParams {
    /// Absolute URL, or a path relative to the application origin.
    pub url: String,

    /// HTTP method (default: GET). Only GET and HEAD are cacheable.
    #[serde(default = "default_method")]
    pub method: String,

    /// Request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Mark the request as a full-page navigation.
    #[serde(default)]
    pub navigate: bool,

    /// Request body, for mutating methods.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the cache_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheFetchOutput {
    pub method: String,
    pub url: String,
    pub status: u16,
    /// Where the response came from: network, cache, fallback or passthrough.
    pub source: ResponseSource,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
    pub body_bytes: usize,
}

/// Implementation of the cache_fetch tool.
pub async fn fetch_impl(worker: &Worker, params: CacheFetchParams) -> Result<CallToolResult, McpError> {
    let origin = worker
        .config()
        .origin_url()
        .map_err(|e| Error::InvalidInput(e.to_string()))?;
    let url = canonicalize(&params.url, &origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let method = params.method.trim().to_uppercase();
    if method.is_empty() {
        return Err(Error::InvalidInput("method must not be empty".into()).into());
    }

    let mut request = InterceptRequest::get(url);
    request.method = method;
    request.headers = params.headers.into_iter().collect();
    request.body = params.body.map(String::into_bytes);
    if params.navigate {
        request = request
            .with_header("Sec-Fetch-Mode", "navigate")
            .with_header("Accept", "text/html,application/xhtml+xml");
    }

    let served = worker.intercept(request.clone()).await;
    tracing::debug!(method = %request.method, url = %request.url, source = ?served.source, status = served.response.status, "cache_fetch");

    let response = served.response;
    let output = CacheFetchOutput {
        method: request.method,
        url: request.url.to_string(),
        status: response.status,
        source: served.source,
        content_type: response.header("content-type").map(str::to_string),
        body: String::from_utf8_lossy(&response.body).into_owned(),
        body_bytes: response.body.len(),
        headers: response.headers,
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
