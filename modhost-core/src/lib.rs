//! Modhost Core Library
//!
//! This crate provides the shared pieces of the Modhost module host:
//! host settings, settings loading and the top-level error type.

pub mod config;
pub mod error;

pub use error::{Error, Result};

/// Modhost version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
