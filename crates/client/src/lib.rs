//! Network client code for the haven worker.
//!
//! This crate provides the `Network` seam the interceptor fetches through,
//! its reqwest implementation, and URL resolution against the app origin.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, Network, UrlError, is_same_origin, resolve};
