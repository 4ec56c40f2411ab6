//! Error types for seglog
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using LogError
pub type Result<T> = std::result::Result<T, LogError>;

/// Unified error type for seglog operations
#[derive(Debug, Error)]
pub enum LogError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Flushing or syncing to stable storage failed while closing a file.
    /// In-memory state may look consistent, but durability is not guaranteed.
    #[error("failed to sync {}: {source}", path.display())]
    Sync {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Store / Index Errors
    // -------------------------------------------------------------------------
    /// Requested index slot lies beyond the written entries.
    #[error("end of index")]
    EndOfIndex,

    /// Requested store position lies beyond the written bytes.
    #[error("end of store")]
    EndOfStore,

    /// The mapped index region has no room for another entry.
    #[error("index exhausted: no room for another entry")]
    IndexExhausted,

    #[error("store is closed")]
    Closed,

    #[error("record of {size} bytes exceeds the maximum record length of {max}")]
    RecordTooLarge { size: u64, max: u64 },

    // -------------------------------------------------------------------------
    // Segment / Log Errors
    // -------------------------------------------------------------------------
    #[error("offset out of range: {offset}")]
    OffsetOutOfRange { offset: u64 },

    #[error("segment {base_offset} is sealed")]
    SegmentSealed { base_offset: u64 },

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

impl LogError {
    /// True for the "requested data is not there" family of errors, as
    /// opposed to I/O or durability failures.
    pub fn is_out_of_range(&self) -> bool {
        matches!(
            self,
            LogError::OffsetOutOfRange { .. } | LogError::EndOfIndex | LogError::EndOfStore
        )
    }
}
