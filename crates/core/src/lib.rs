//! Core types and shared functionality for offcache.
//!
//! This crate provides:
//! - Store registry with SQLite backend and FIFO eviction
//! - Request classification and the request/response model
//! - Push payload decoding
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod push;
pub mod route;

pub use cache::{Generation, StoreRegistry};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use model::{CachedEntry, InterceptRequest, RequestIdentity, Response, ResponseSource, Served};
pub use route::{RouteClass, RouteTable};
