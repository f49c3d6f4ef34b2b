//! Error types for Modhost

use thiserror::Error;

/// Result type for Modhost operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Modhost
#[derive(Error, Debug)]
pub enum Error {
    /// Settings error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Remote registration error
    #[error("Remote error: {0}")]
    Remote(String),
}
