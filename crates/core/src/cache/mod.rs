//! SQLite-backed registry of named, versioned response stores.
//!
//! This module provides the persistent half of the request-cache layer:
//!
//! - Request-identity keys hashed with SHA-256
//! - Named stores with insertion-ordered, immutable entries
//! - Generation-based store naming for deploy cutover
//! - FIFO enforcement of a maximum entry count
//! - Automatic schema migrations and WAL mode for concurrent access

pub mod connection;
pub mod eviction;
pub mod generation;
pub mod hash;
pub mod migrations;
pub mod stores;

pub use crate::Error;

pub use connection::StoreRegistry;
pub use eviction::DEFAULT_MAX_ENTRIES;
pub use generation::Generation;
