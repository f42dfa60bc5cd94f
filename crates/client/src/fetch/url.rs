//! URL canonicalization for consistent cache keys.

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Canonicalize a request URL so equivalent spellings share a cache key.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Resolve root-relative and relative references against `base`
/// 3. Lowercase the host
/// 4. Remove fragment (#...), which never reaches the network
/// 5. Keep query string intact (do not reorder)
///
/// The scheme is not checked here; see [`super::is_fetchable`].
pub fn canonicalize(input: &str, base: &url::Url) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = base.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    if let Some(host) = parsed.host_str() {
        let lowered = host.to_lowercase();
        if lowered != host {
            parsed
                .set_host(Some(&lowered))
                .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
        }
    }

    parsed.set_fragment(None);

    Ok(parsed)
}
