//! Crate-wide error types.

use thiserror::Error;

use crate::monitor::QueryError;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Stream query failed: {0}")]
    Query(#[from] QueryError),

    #[error("Helix client error: {0}")]
    Helix(#[from] helix_api::HelixError),

    #[error("Stream monitor is already running")]
    AlreadyRunning,
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
