//! Fetch strategies.
//!
//! Static assets are served cache-first; API endpoints and everything else
//! go network-first. Each call produces exactly one response and never
//! retries: a failed fetch moves straight on to the cache, then to the
//! fallback chain.
//!
//! A non-success status from the network is never written to a store. It
//! may be replaced by a cached entry, but it is returned as-is rather than
//! swapped for a synthetic fallback, since the server did answer.

use std::sync::Arc;
use std::time::Duration;

use offcache_core::{
    AppConfig, CachedEntry, Error, Generation, InterceptRequest, RequestIdentity, Response, ResponseSource, RouteClass,
    Served, StoreRegistry,
};
use tokio::task::JoinHandle;

use crate::fallback::FallbackResolver;
use crate::fetch::Network;

/// Knobs that change how strategies write through.
#[derive(Debug, Clone)]
pub struct StrategyOptions {
    /// Upper bound on a single network attempt.
    pub timeout: Duration,
    /// Write successful API responses to the dynamic store.
    pub cache_api_responses: bool,
    /// Refresh a cache-first hit in the background.
    pub revalidate_on_hit: bool,
}

impl Default for StrategyOptions {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(10), cache_api_responses: true, revalidate_on_hit: true }
    }
}

impl From<&AppConfig> for StrategyOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            timeout: config.timeout(),
            cache_api_responses: config.cache_api_responses,
            revalidate_on_hit: config.revalidate_on_hit,
        }
    }
}

/// Runs the strategy chosen for a route class against one generation's stores.
#[derive(Clone)]
pub struct StrategyExecutor {
    registry: StoreRegistry,
    network: Arc<dyn Network>,
    fallback: FallbackResolver,
    options: StrategyOptions,
}

/// Fetch with a hard deadline. Elapsed time is a definite failure.
async fn fetch_with_timeout(
    network: &dyn Network, request: &InterceptRequest, timeout: Duration,
) -> Result<Response, Error> {
    match tokio::time::timeout(timeout, network.fetch(request)).await {
        Ok(result) => result,
        Err(_) => Err(Error::FetchTimeout(format!("{} after {}ms", request.url, timeout.as_millis()))),
    }
}

impl StrategyExecutor {
    pub fn new(
        registry: StoreRegistry, network: Arc<dyn Network>, fallback: FallbackResolver, options: StrategyOptions,
    ) -> Self {
        Self { registry, network, fallback, options }
    }

    /// Dispatch on route class.
    pub async fn execute(&self, request: &InterceptRequest, class: RouteClass, generation: &Generation) -> Served {
        match class {
            RouteClass::StaticAsset => self.cache_first(request, generation).await,
            RouteClass::ApiEndpoint | RouteClass::Other => self.network_first(request, class, generation).await,
        }
    }

    /// Send the request to the network without touching any store.
    ///
    /// Used for mutating methods, non-fetchable schemes, and traffic that
    /// arrives before any generation is active.
    pub async fn passthrough(&self, request: &InterceptRequest, generation: Option<&Generation>) -> Served {
        match fetch_with_timeout(self.network.as_ref(), request, self.options.timeout).await {
            Ok(response) => Served::new(response, ResponseSource::Passthrough),
            Err(e) => {
                tracing::debug!(method = %request.method, url = %request.url, "passthrough failed: {e}");
                Served::new(self.fallback.resolve(request, generation).await, ResponseSource::Fallback)
            }
        }
    }

    /// Network first, then either store, then the fallback chain.
    pub async fn network_first(&self, request: &InterceptRequest, class: RouteClass, generation: &Generation) -> Served {
        let identity = request.identity();

        let network_response = match fetch_with_timeout(self.network.as_ref(), request, self.options.timeout).await {
            Ok(response) if response.is_success() => {
                let write_through = class != RouteClass::ApiEndpoint || self.options.cache_api_responses;
                if write_through
                    && let Err(e) = self.registry.put(&generation.dynamic_store(), &identity, &response).await
                {
                    tracing::warn!(key = %identity, "dynamic store write failed: {e}");
                }
                return Served::new(response, ResponseSource::Network);
            }
            Ok(response) => {
                tracing::debug!(key = %identity, status = response.status, "non-success status, trying cache");
                Some(response)
            }
            Err(e) => {
                tracing::debug!(key = %identity, "network failed, trying cache: {e}");
                None
            }
        };

        if let Some(entry) = self.lookup(&identity, generation).await {
            return Served::new(entry.response, ResponseSource::Cache);
        }

        match network_response {
            Some(response) => Served::new(response, ResponseSource::Network),
            None => Served::new(self.fallback.resolve(request, Some(generation)).await, ResponseSource::Fallback),
        }
    }

    /// Either store first; on a miss fetch and fill the static store.
    pub async fn cache_first(&self, request: &InterceptRequest, generation: &Generation) -> Served {
        let identity = request.identity();

        if let Some(entry) = self.lookup(&identity, generation).await {
            tracing::debug!(key = %identity, store = %entry.store, "cache hit");
            if self.options.revalidate_on_hit {
                // Detached; the served response never waits on it.
                drop(self.revalidate(request.clone(), entry.store.clone()));
            }
            return Served::new(entry.response, ResponseSource::Cache);
        }

        match fetch_with_timeout(self.network.as_ref(), request, self.options.timeout).await {
            Ok(response) => {
                if response.is_success()
                    && let Err(e) = self.registry.put(&generation.static_store(), &identity, &response).await
                {
                    tracing::warn!(key = %identity, "static store write failed: {e}");
                }
                Served::new(response, ResponseSource::Network)
            }
            Err(e) => {
                tracing::debug!(key = %identity, "cache miss and network failed: {e}");
                Served::new(self.fallback.resolve(request, Some(generation)).await, ResponseSource::Fallback)
            }
        }
    }

    /// Refetch `request` and replace its entry in `store`.
    ///
    /// Runs as its own task; failures are logged and dropped. A store that
    /// was deleted in the meantime is left deleted.
    pub fn revalidate(&self, request: InterceptRequest, store: String) -> JoinHandle<()> {
        let registry = self.registry.clone();
        let network = Arc::clone(&self.network);
        let timeout = self.options.timeout;

        tokio::spawn(async move {
            let identity = request.identity();
            match fetch_with_timeout(network.as_ref(), &request, timeout).await {
                Ok(response) if response.is_success() => {
                    match registry.put_if_store_exists(&store, &identity, &response).await {
                        Ok(true) => tracing::debug!(key = %identity, %store, "revalidated"),
                        Ok(false) => tracing::debug!(key = %identity, %store, "store retired before revalidation"),
                        Err(e) => tracing::warn!(key = %identity, %store, "revalidation write failed: {e}"),
                    }
                }
                Ok(response) => {
                    tracing::debug!(key = %identity, status = response.status, "revalidation skipped non-success");
                }
                Err(e) => tracing::debug!(key = %identity, "revalidation failed: {e}"),
            }
        })
    }

    /// Look `identity` up in the generation's stores. Storage errors are misses.
    async fn lookup(&self, identity: &RequestIdentity, generation: &Generation) -> Option<CachedEntry> {
        match self.registry.match_any(&generation.store_names(), identity).await {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key = %identity, "cache lookup failed, treating as miss: {e}");
                None
            }
        }
    }
}
