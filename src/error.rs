//! Error types for AtlasKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using AtlasError
pub type Result<T> = std::result::Result<T, AtlasError>;

/// Unified error type for AtlasKV operations
#[derive(Debug, Error)]
pub enum AtlasError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Corruption (bad length, unexpected EOF inside a record, file-id mismatch)
    // -------------------------------------------------------------------------
    #[error("corruption detected: {0}")]
    Corrupt(String),

    // -------------------------------------------------------------------------
    // Directory lock
    // -------------------------------------------------------------------------
    #[error("data directory is locked by another process: {0}")]
    Locked(String),

    // -------------------------------------------------------------------------
    // Bad caller arguments (null key/value, mismatched batch lengths, ...)
    // -------------------------------------------------------------------------
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Engine lifecycle
    // -------------------------------------------------------------------------
    #[error("engine is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("storage error: {0}")]
    Storage(String),

    #[error("key not found")]
    KeyNotFound,

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("network error: {0}")]
    Network(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Concurrency Errors
    // -------------------------------------------------------------------------
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}
