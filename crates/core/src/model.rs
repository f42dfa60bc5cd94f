//! Request and response values that flow through the cache layer.
//!
//! The layer is content-agnostic: bodies are opaque bytes and headers are
//! carried as ordered name/value pairs.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::hash::compute_request_key;

/// An outgoing request observed by the interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptRequest {
    pub method: String,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl InterceptRequest {
    /// A bodiless GET for `url`.
    pub fn get(url: Url) -> Self {
        Self { method: "GET".into(), url, headers: Vec::new(), body: None }
    }

    /// Add a header, keeping any existing ones.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// First header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// GET and HEAD carry no expected side effects and are the only methods
    /// eligible for caching.
    pub fn is_safe_method(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET") || self.method.eq_ignore_ascii_case("HEAD")
    }

    /// Whether the request is a full-page document load.
    ///
    /// A `Sec-Fetch-Mode: navigate` header wins; otherwise an `Accept`
    /// header listing `text/html` marks a navigation.
    pub fn is_navigation(&self) -> bool {
        if !self.method.eq_ignore_ascii_case("GET") {
            return false;
        }
        if let Some(mode) = self.header("sec-fetch-mode") {
            return mode.eq_ignore_ascii_case("navigate");
        }
        self.header("accept").is_some_and(|accept| accept.contains("text/html"))
    }

    /// Cache identity for this request.
    pub fn identity(&self) -> RequestIdentity {
        RequestIdentity::new(&self.method, self.url.clone())
    }
}

/// The (method, absolute URL) pair used as the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestIdentity {
    pub method: String,
    pub url: Url,
}

impl RequestIdentity {
    pub fn new(method: &str, url: Url) -> Self {
        Self { method: method.to_ascii_uppercase(), url }
    }

    /// Hex SHA-256 of the identity, used as the row key.
    pub fn key_hash(&self) -> String {
        compute_request_key(&self.method, self.url.as_str())
    }
}

impl std::fmt::Display for RequestIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A response as produced by the network, the cache, or the fallback chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    /// A `text/plain` response with the given status.
    pub fn plain(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: vec![("content-type".into(), "text/plain; charset=utf-8".into())],
            body: body.as_bytes().to_vec(),
        }
    }

    /// Cacheable success: any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A stored response together with its identity and capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CachedEntry {
    pub store: String,
    pub key_hash: String,
    pub method: String,
    pub url: String,
    pub response: Response,
    pub cached_at: String,
}

/// Where an intercepted response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    /// Fresh from the network, possibly written through to a store.
    Network,
    /// Served from a store.
    Cache,
    /// Substituted by the fallback chain.
    Fallback,
    /// Not eligible for caching, sent straight to the network.
    Passthrough,
}

/// The single response produced for an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub response: Response,
    pub source: ResponseSource,
}

impl Served {
    pub fn new(response: Response, source: ResponseSource) -> Self {
        Self { response, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_identity_ignores_headers() {
        let a = InterceptRequest::get(url("https://example.com/a?x=1")).with_header("Accept", "text/html");
        let b = InterceptRequest::get(url("https://example.com/a?x=1")).with_header("Accept", "*/*");
        assert_eq!(a.identity().key_hash(), b.identity().key_hash());
    }

    #[test]
    fn test_identity_includes_query_and_method() {
        let a = InterceptRequest::get(url("https://example.com/a?x=1"));
        let b = InterceptRequest::get(url("https://example.com/a?x=2"));
        assert_ne!(a.identity().key_hash(), b.identity().key_hash());

        let head = RequestIdentity::new("head", url("https://example.com/a?x=1"));
        assert_eq!(head.method, "HEAD");
        assert_ne!(head.key_hash(), a.identity().key_hash());
    }

    #[test]
    fn test_navigation_detection() {
        let html = InterceptRequest::get(url("https://example.com/")).with_header("Accept", "text/html,*/*");
        assert!(html.is_navigation());

        let img = InterceptRequest::get(url("https://example.com/icon.png")).with_header("Accept", "image/*");
        assert!(!img.is_navigation());

        let nav = InterceptRequest::get(url("https://example.com/")).with_header("Sec-Fetch-Mode", "navigate");
        assert!(nav.is_navigation());

        let no_accept = InterceptRequest::get(url("https://example.com/"));
        assert!(!no_accept.is_navigation());
    }

    #[test]
    fn test_safe_methods() {
        let mut req = InterceptRequest::get(url("https://example.com/"));
        assert!(req.is_safe_method());
        req.method = "POST".into();
        assert!(!req.is_safe_method());
    }

    #[test]
    fn test_plain_response() {
        let resp = Response::plain(503, "Offline");
        assert!(!resp.is_success());
        assert_eq!(resp.header("Content-Type"), Some("text/plain; charset=utf-8"));
        assert_eq!(resp.body, b"Offline");
    }
}
