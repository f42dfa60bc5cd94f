//! Terminal fallback chain.
//!
//! When neither the network nor a direct cache lookup produced a response,
//! navigations get the offline document, then the root document, and
//! finally a synthetic 503. Every other request gets the synthetic 503.

use offcache_core::{AppConfig, ConfigError, Generation, InterceptRequest, RequestIdentity, Response, StoreRegistry};
use url::Url;

/// Status of the synthetic response.
pub const OFFLINE_STATUS: u16 = 503;

/// Body of the synthetic response.
pub const OFFLINE_BODY: &str = "Offline";

/// Produces a substitute response. Never fails.
#[derive(Clone)]
pub struct FallbackResolver {
    registry: StoreRegistry,
    offline_document: Option<Url>,
    root_document: Url,
}

impl FallbackResolver {
    pub fn new(registry: StoreRegistry, offline_document: Option<Url>, root_document: Url) -> Self {
        Self { registry, offline_document, root_document }
    }

    /// Build from configuration, resolving the offline and root documents against the origin.
    pub fn from_config(registry: StoreRegistry, config: &AppConfig) -> Result<Self, ConfigError> {
        let offline_document = config.offline_document.as_deref().map(|p| config.resolve(p)).transpose()?;
        let root_document = config.resolve("/")?;
        Ok(Self::new(registry, offline_document, root_document))
    }

    /// The synthetic error response.
    pub fn synthetic() -> Response {
        Response::plain(OFFLINE_STATUS, OFFLINE_BODY)
    }

    /// Pick a substitute response for `request`.
    ///
    /// Cached documents are looked up in `generation`'s stores only; with no
    /// active generation the synthetic response is the only option.
    pub async fn resolve(&self, request: &InterceptRequest, generation: Option<&Generation>) -> Response {
        let Some(generation) = generation else {
            return Self::synthetic();
        };
        if !request.is_navigation() {
            return Self::synthetic();
        }

        let stores = generation.store_names();
        let candidates = self.offline_document.iter().chain(std::iter::once(&self.root_document));

        for document in candidates {
            let identity = RequestIdentity::new("GET", document.clone());
            match self.registry.match_any(&stores, &identity).await {
                Ok(Some(entry)) => {
                    tracing::debug!(url = %request.url, document = %document, "serving fallback document");
                    return entry.response;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(document = %document, "fallback lookup failed, treating as miss: {e}");
                }
            }
        }

        Self::synthetic()
    }
}
