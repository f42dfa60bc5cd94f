//! MCP tool implementations.
//!
//! This module contains all tools exposed by the mcp-offcache server.

pub mod cache;
pub mod deploy;
pub mod fetch;
pub mod push;

#[cfg(test)]
pub(crate) mod testing;

pub use deploy::{CacheDeployParams, deploy_impl};
pub use fetch::{CacheFetchParams, fetch_impl};
pub use push::{NotificationActionParams, PushDispatchParams, action_impl, push_impl};
