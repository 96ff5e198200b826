//! Error types for lumen-study

use thiserror::Error;

use crate::embedding::StatusError;

/// Top-level error for lumen-study operations
#[derive(Debug, Error)]
pub enum Error {
    /// Embedding status query failed
    #[error("Status query error: {0}")]
    Status(#[from] StatusError),

    /// Record or deck file could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// lumen-common error
    #[error("Common error: {0}")]
    Common(#[from] lumen_common::Error),
}

/// Result type for lumen-study operations
pub type Result<T> = std::result::Result<T, Error>;
