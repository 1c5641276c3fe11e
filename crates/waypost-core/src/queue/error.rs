//! Queue error handling
//!
//! Typed errors for the durable queue. `DuplicateKey` is the only error a
//! caller is expected to recover from; everything else indicates the queue
//! itself is unhealthy and aborts the current drain.

use thiserror::Error;

/// Errors that can occur in the local durable queue
#[derive(Error, Debug)]
pub enum QueueError {
    /// A pending record with this business key already exists locally.
    /// The caller must pick a different key or treat the write as an edit.
    #[error("a pending record with key '{business_key}' already exists in '{collection}'")]
    DuplicateKey {
        collection: String,
        business_key: String,
    },

    /// Stored payload could not be parsed back from the database
    #[error("record {local_id} has a corrupt payload: {details}")]
    CorruptPayload { local_id: i64, details: String },

    /// Underlying SQLite failure
    #[error("queue database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl QueueError {
    /// Whether the caller can recover by changing its input.
    ///
    /// Non-recoverable errors abort the drain that hit them, since
    /// continuing against a broken queue risks double-submission.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, QueueError::DuplicateKey { .. })
    }
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;
