//! Event handlers.
//!
//! Each submodule handles one family of platform events and returns an
//! `Outcome` for the host to apply.

pub mod intercept;
pub mod lifecycle;
pub mod message;
pub mod offline;
pub mod push;
pub mod sync;
