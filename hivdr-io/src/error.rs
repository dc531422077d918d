use std::io;
use thiserror::Error;

/// Error type for writing hivdr result tables.
#[derive(Error, Debug)]
pub enum WriteError {
    /// IO error occurred during file operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Output format name not recognised.
    #[error("Unknown output format: {0}")]
    UnknownFormat(String),
}

/// Result type alias for hivdr-io write operations.
pub type Result<T> = std::result::Result<T, WriteError>;
