//! Versioned store naming.
//!
//! Stores are named `<app-id>-static-v<generation>` and
//! `<app-id>-dynamic-v<generation>`.

use serde::{Deserialize, Serialize};

/// One complete, internally consistent set of stores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Generation {
    pub app_id: String,
    pub number: u32,
}

impl Generation {
    pub fn new(app_id: impl Into<String>, number: u32) -> Self {
        Self { app_id: app_id.into(), number }
    }

    /// Name of the store provisioned from the asset manifest.
    pub fn static_store(&self) -> String {
        format!("{}-static-v{}", self.app_id, self.number)
    }

    /// Name of the store grown from runtime traffic.
    pub fn dynamic_store(&self) -> String {
        format!("{}-dynamic-v{}", self.app_id, self.number)
    }

    /// Both store names, static first.
    pub fn store_names(&self) -> [String; 2] {
        [self.static_store(), self.dynamic_store()]
    }

    /// Whether `name` belongs to this generation.
    pub fn owns(&self, name: &str) -> bool {
        name == self.static_store() || name == self.dynamic_store()
    }

    /// Parse a store name back into its generation, if it follows the convention.
    pub fn parse_store_name(name: &str) -> Option<Self> {
        let (prefix, number) = name.rsplit_once("-v")?;
        let number = number.parse().ok()?;
        let app_id = prefix
            .strip_suffix("-static")
            .or_else(|| prefix.strip_suffix("-dynamic"))?;
        if app_id.is_empty() {
            return None;
        }
        Some(Self::new(app_id, number))
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-v{}", self.app_id, self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_names() {
        let generation = Generation::new("knower-life", 3);
        assert_eq!(generation.static_store(), "knower-life-static-v3");
        assert_eq!(generation.dynamic_store(), "knower-life-dynamic-v3");
        assert!(generation.owns("knower-life-dynamic-v3"));
        assert!(!generation.owns("knower-life-dynamic-v2"));
    }

    #[test]
    fn test_parse_store_name() {
        let parsed = Generation::parse_store_name("knower-life-static-v12").unwrap();
        assert_eq!(parsed, Generation::new("knower-life", 12));

        assert!(Generation::parse_store_name("knower-life-v3").is_none());
        assert!(Generation::parse_store_name("knower-life-static-vx").is_none());
        assert!(Generation::parse_store_name("-static-v1").is_none());
    }
}
