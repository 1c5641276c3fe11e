//! Data models for Waypost
//!
//! Defines the core data structures: pending records, their synchronization
//! state, and the per-attempt classification the orchestrator works with.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Handle to a record in the local queue.
///
/// Owned exclusively by the queue; it never crosses the wire to the
/// remote authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalId(pub i64);

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Synchronization state of a locally captured record.
///
/// There are only two persisted states. A failed submission attempt leaves
/// the record `Pending`; there is no terminal failure state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncState {
    /// Captured locally, not yet confirmed by the remote authority
    Pending,
    /// Confirmed by the remote authority (created or already present)
    Synced,
}

impl SyncState {
    /// Integer encoding used by the SQLite queue
    pub fn as_i64(self) -> i64 {
        match self {
            SyncState::Pending => 0,
            SyncState::Synced => 1,
        }
    }

    /// Decode from the SQLite representation
    pub fn from_i64(value: i64) -> Self {
        if value == 0 {
            SyncState::Pending
        } else {
            SyncState::Synced
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Pending => write!(f, "pending"),
            SyncState::Synced => write!(f, "synced"),
        }
    }
}

/// A record as captured by the caller, before the queue assigns a local id.
///
/// `collection` names the remote endpoint the record belongs to (e.g.
/// "beneficiaries", "inventory"); `business_key` is the caller-chosen
/// identifier the remote authority enforces uniqueness on. The payload is
/// immutable once enqueued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDraft {
    pub collection: String,
    pub business_key: String,
    pub payload: Map<String, Value>,
}

impl RecordDraft {
    /// Create a new draft with an empty payload
    pub fn new(collection: impl Into<String>, business_key: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            business_key: business_key.into(),
            payload: Map::new(),
        }
    }

    /// Add a payload field (builder style)
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(name.into(), value.into());
        self
    }
}

/// A record held by the durable queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRecord {
    /// Queue-local handle; never sent to the remote authority
    pub local_id: LocalId,
    /// Remote endpoint this record belongs to
    pub collection: String,
    /// Caller-chosen globally unique identifier
    pub business_key: String,
    /// Field values to be created remotely; immutable once enqueued
    pub payload: Map<String, Value>,
    /// Current synchronization state
    pub sync_state: SyncState,
    /// Reason the remote authority last rejected this record, if it did.
    /// Distinguishes "waiting for network" from "needs attention".
    pub last_rejection: Option<String>,
    /// When this record was captured locally
    pub created_at: DateTime<Utc>,
}

impl PendingRecord {
    /// Whether the last submission attempt was a non-recoverable rejection
    pub fn needs_attention(&self) -> bool {
        self.sync_state == SyncState::Pending && self.last_rejection.is_some()
    }
}

/// Process-wide connectivity signal.
///
/// The connectivity monitor is the sole writer; everyone else observes it
/// through a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    Offline,
    Online,
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectivityState::Offline => write!(f, "offline"),
            ConnectivityState::Online => write!(f, "online"),
        }
    }
}

/// Classification of one submission attempt for one record.
///
/// Ephemeral; produced per record per drain, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAttemptResult {
    /// The remote authority created the record
    Accepted,
    /// The business key is already present remotely. Treated as success:
    /// a previous attempt reached the server but its response was lost.
    AlreadyExists,
    /// Network error, timeout, or server-side failure; retried next drain
    TransientFailure { message: String },
    /// Non-recoverable client error other than the uniqueness conflict.
    /// The record stays pending and is flagged for the caller.
    RejectedByServer { status: u16, message: String },
}

/// Per-record outcome emitted during a drain, for status reporting
#[derive(Debug, Clone)]
pub enum RecordEvent {
    /// The record was confirmed by the remote authority
    Synced {
        local_id: LocalId,
        business_key: String,
    },
    /// The attempt failed transiently; the record waits for the next drain
    StillPending {
        local_id: LocalId,
        business_key: String,
        reason: String,
    },
    /// The remote authority rejected the record; it needs attention
    Rejected {
        local_id: LocalId,
        business_key: String,
        status: u16,
        message: String,
    },
}
