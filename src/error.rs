//! Error types for DuraKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using DuraError
pub type Result<T> = std::result::Result<T, DuraError>;

/// Unified error type for DuraKV operations
#[derive(Debug, Error)]
pub enum DuraError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("no such key")]
    NoSuchKey,

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("value too large: {size} bytes (max {max})")]
    ValueTooLarge { size: usize, max: usize },

    // -------------------------------------------------------------------------
    // Transaction Log Backend Errors
    // -------------------------------------------------------------------------
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("transaction log backend failure: {0}")]
    Backend(String),

    // -------------------------------------------------------------------------
    // Replay Errors
    // -------------------------------------------------------------------------
    #[error("transaction log parse error at {location}: {reason}")]
    Parse { location: String, reason: String },

    #[error("transaction numbers out of sequence: {found} follows {last}")]
    OutOfSequence { last: u64, found: u64 },

    #[error("transaction log replay was already consumed")]
    ReplayConsumed,

    #[error("transaction log replay aborted by the consumer")]
    ReplayAborted,

    // -------------------------------------------------------------------------
    // Logger Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("transaction logger cannot run before a complete replay")]
    ReplayIncomplete,

    #[error("transaction logger is already running")]
    AlreadyRunning,

    #[error("transaction logger degraded, writes are no longer durable: {0}")]
    LoggerDegraded(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DuraError {
    /// Whether this error means the persisted log cannot be trusted
    pub fn is_corruption(&self) -> bool {
        matches!(self, DuraError::Parse { .. } | DuraError::OutOfSequence { .. })
    }
}
