//! Error types for the Tote engine.

use crate::ProductId;
use thiserror::Error;

/// All possible errors from the Tote engine.
#[derive(Debug, Error)]
pub enum Error {
    // Entry errors
    #[error("entry not found: {0}")]
    EntryNotFound(ProductId),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    // Storage errors
    #[error("local storage error: {0}")]
    Storage(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Backend errors
    #[error("backend error: {0}")]
    Backend(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
