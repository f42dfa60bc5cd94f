//! Request classification.
//!
//! An ordered rule table is evaluated top-down and the first matching rule
//! decides the route class. API prefixes are always placed ahead of the
//! static manifest, so a path listed in both is an API endpoint.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::model::InterceptRequest;

/// Route class assigned to a request; decides the fetch strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RouteClass {
    StaticAsset,
    ApiEndpoint,
    Other,
}

/// How a rule compares against a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatcher {
    Exact(String),
    Prefix(String),
}

impl PathMatcher {
    fn matches(&self, path: &str) -> bool {
        match self {
            PathMatcher::Exact(p) => path == p,
            PathMatcher::Prefix(p) => path.starts_with(p.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    pub matcher: PathMatcher,
    pub class: RouteClass,
}

/// Ordered classification rules scoped to one origin.
///
/// Requests to any other origin are classified as [`RouteClass::Other`].
#[derive(Debug, Clone)]
pub struct RouteTable {
    origin: Url,
    rules: Vec<RouteRule>,
}

impl RouteTable {
    /// Build the table: one prefix rule per API prefix, then one rule per
    /// manifest path. Manifest paths ending in `/` (other than the root)
    /// match as prefixes; everything else must match exactly.
    pub fn new(origin: Url, api_prefixes: &[String], manifest: &[String]) -> Self {
        let mut rules = Vec::with_capacity(api_prefixes.len() + manifest.len());

        for prefix in api_prefixes {
            rules.push(RouteRule { matcher: PathMatcher::Prefix(prefix.clone()), class: RouteClass::ApiEndpoint });
        }

        for path in manifest {
            let matcher = if path.len() > 1 && path.ends_with('/') {
                PathMatcher::Prefix(path.clone())
            } else {
                PathMatcher::Exact(path.clone())
            };
            rules.push(RouteRule { matcher, class: RouteClass::StaticAsset });
        }

        Self { origin, rules }
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    /// Classify a request by its origin and path. The query string is ignored.
    pub fn classify(&self, request: &InterceptRequest) -> RouteClass {
        if request.url.origin() != self.origin.origin() {
            return RouteClass::Other;
        }

        let path = request.url.path();
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(path))
            .map(|rule| rule.class)
            .unwrap_or(RouteClass::Other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::new(
            Url::parse("https://app.example").unwrap(),
            &["/api/chat".into(), "/api/analyze".into()],
            &["/".into(), "/index.html".into(), "/styles.css".into(), "/icons/".into()],
        )
    }

    fn get(url: &str) -> InterceptRequest {
        InterceptRequest::get(Url::parse(url).unwrap())
    }

    #[test]
    fn test_classify_api() {
        assert_eq!(table().classify(&get("https://app.example/api/chat")), RouteClass::ApiEndpoint);
        assert_eq!(table().classify(&get("https://app.example/api/analyze/42?x=1")), RouteClass::ApiEndpoint);
    }

    #[test]
    fn test_classify_static_exact_and_prefix() {
        assert_eq!(table().classify(&get("https://app.example/")), RouteClass::StaticAsset);
        assert_eq!(table().classify(&get("https://app.example/styles.css?v=2")), RouteClass::StaticAsset);
        assert_eq!(table().classify(&get("https://app.example/icons/icon-192.png")), RouteClass::StaticAsset);
    }

    #[test]
    fn test_root_is_not_a_prefix() {
        assert_eq!(table().classify(&get("https://app.example/about")), RouteClass::Other);
    }

    #[test]
    fn test_api_rule_wins_over_manifest() {
        let table = RouteTable::new(
            Url::parse("https://app.example").unwrap(),
            &["/api".into()],
            &["/api/status".into()],
        );
        assert_eq!(table.classify(&get("https://app.example/api/status")), RouteClass::ApiEndpoint);
        assert_eq!(table.rules()[0].class, RouteClass::ApiEndpoint);
    }

    #[test]
    fn test_cross_origin_is_other() {
        assert_eq!(table().classify(&get("https://cdn.example/styles.css")), RouteClass::Other);
        assert_eq!(table().classify(&get("http://app.example/styles.css")), RouteClass::Other);
    }
}
