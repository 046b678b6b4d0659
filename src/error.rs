//! Error types for the route watcher.

use thiserror::Error;

/// Main error type for page stack and storage operations.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Checksum mismatch: expected {expected}, got {got}")]
    ChecksumMismatch { expected: u32, got: u32 },

    #[error("Storage is locked by another process")]
    Locked,

    #[error("Page stack not initialized")]
    NotInitialized,

    #[error("Page stack has no current entry")]
    EmptyStack,

    #[error("Invalid url: {0}")]
    InvalidUrl(String),

    #[error("Page data producer failed: {0}")]
    Producer(String),

    #[error("Browser API error: {0}")]
    Browser(String),
}

impl From<serde_json::Error> for WatchError {
    fn from(e: serde_json::Error) -> Self {
        WatchError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for WatchError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        WatchError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for WatchError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        WatchError::Deserialization(e.to_string())
    }
}

/// Result type for route watcher operations.
pub type Result<T> = std::result::Result<T, WatchError>;
