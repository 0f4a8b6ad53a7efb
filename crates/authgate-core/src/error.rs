//! Error types for `authgate` core library.

use thiserror::Error;

/// Result type alias using `authgate` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `authgate` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
