//! Network side of offcache.
//!
//! This crate provides the fetch pipeline, the caching strategies, the
//! fallback chain, the generation lifecycle, push notification dispatch,
//! and the event scheduler that ties them together.

pub mod fallback;
pub mod fetch;
pub mod lifecycle;
pub mod notify;
pub mod strategy;
pub mod worker;

#[cfg(test)]
mod testing;

pub use fallback::FallbackResolver;
pub use fetch::{FetchClient, FetchConfig, Network};
pub use lifecycle::{ActivationReport, InstallReport, LifecycleController, Phase, RegistryState};
pub use notify::{NotificationDispatcher, Notifier, UserAction};
pub use strategy::{StrategyExecutor, StrategyOptions};
pub use worker::{Worker, WorkerEvent, WorkerOutcome};
