//! Core types and shared functionality for the haven worker.
//!
//! This crate provides:
//! - Named cache stores with a SQLite backend
//! - The request/response model
//! - Host-mirrored key-value storage
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod storage;

pub use cache::{CacheDb, CacheKey};
pub use config::{ConfigError, NotificationConfig, WorkerConfig};
pub use error::Error;
pub use http::{Destination, Request, RequestMode, Response, ResponseType};
