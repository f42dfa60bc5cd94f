//! Fetchable-scheme filtering.
//!
//! Requests whose URL uses a non-network scheme (extension-internal pages,
//! inline data, blobs) never enter the cache layer; the interceptor hands
//! them straight to the network untouched.
use url::Url;

/// Schemes that are never cached.
pub const DENIED_SCHEMES: &[&str] = &[
    "file",
    "ftp",
    "data",
    "javascript",
    "chrome",
    "chrome-extension",
    "moz-extension",
    "safari-web-extension",
    "about",
    "blob",
    "ws",
    "wss",
];

/// Whether a URL may take part in a caching strategy.
///
/// Only `http` and `https` qualify; everything in [`DENIED_SCHEMES`] and any
/// unknown scheme is rejected.
pub fn is_fetchable(url: &Url) -> bool {
    let scheme = url.scheme();
    if DENIED_SCHEMES.contains(&scheme) {
        return false;
    }
    matches!(scheme, "http" | "https")
}
