//! Waypost Core Library
//!
//! Offline-first record capture and reconciliation. A client keeps
//! accepting writes while disconnected from its backend, then replays them
//! once connectivity returns, without duplicating or losing records and
//! without user intervention.
//!
//! # Architecture
//!
//! - **Durable queue**: SQLite-backed store for records captured offline;
//!   the source of truth for everything still pending
//! - **Connectivity monitor**: turns offline→online edges and explicit
//!   kicks into coalesced drain triggers
//! - **Sync orchestrator**: drains the queue against the remote authority,
//!   normalizing uniqueness conflicts into successes
//!
//! The remote authority is only reached through the [`RemoteAuthority`]
//! trait, and credentials through [`CredentialProvider`], so the whole
//! engine runs in tests without a network or a session.
//!
//! # Quick Start
//!
//! ```text
//! let queue = DurableQueue::open(&config)?;
//! let remote = Arc::new(HttpRemote::new(api_url, credentials));
//! let engine = Engine::start(queue, remote);
//!
//! engine.enqueue(&RecordDraft::new("beneficiaries", "A-123"))?;
//! engine.monitor().report_online();
//! ```
//!
//! # Modules
//!
//! - `engine`: facade wiring queue, monitor and orchestrator (main entry point)
//! - `queue`: the local durable queue
//! - `monitor`: connectivity tracking and trigger coalescing
//! - `orchestrator`: the drain algorithm
//! - `remote`: the remote authority seam and its HTTP implementation
//! - `models`: shared data structures
//! - `config`: application configuration

pub mod config;
pub mod engine;
pub mod models;
pub mod monitor;
pub mod orchestrator;
pub mod queue;
pub mod remote;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use engine::Engine;
pub use models::{
    ConnectivityState, LocalId, PendingRecord, RecordDraft, RecordEvent, SyncAttemptResult,
    SyncState,
};
pub use monitor::{ConnectivityMonitor, DrainTrigger};
pub use orchestrator::{DrainError, DrainReport, SyncOrchestrator};
pub use queue::{DurableQueue, QueueError};
pub use remote::{CredentialProvider, HttpRemote, OutboundRecord, RemoteAuthority, StaticCredentials};
