//! SQLite-backed named cache stores.
//!
//! This module provides the request → response storage the interceptor and
//! the lifecycle controller share:
//!
//! - Named, versioned stores with creation-order precedence
//! - Structured `CacheKey` identities hashed with SHA-256
//! - Atomic per-entry UPSERTs
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod key;
pub mod migrations;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use key::CacheKey;
