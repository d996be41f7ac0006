//! Error types for CDP

use thiserror::Error;

/// Result type alias for CDP operations
pub type Result<T> = std::result::Result<T, CdpError>;

/// Main error type for CDP
#[derive(Error, Debug)]
pub enum CdpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid data type: {0}")]
    InvalidDataType(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Invalid job type: {0}")]
    InvalidJobType(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}
