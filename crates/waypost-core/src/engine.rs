//! Engine facade
//!
//! One entry point wiring the durable queue, the connectivity monitor and
//! the sync orchestrator together, with the drain loop running as a
//! background task.
//!
//! ## Usage
//!
//! ```ignore
//! let queue = DurableQueue::open(&config)?;
//! let remote = Arc::new(HttpRemote::new(api_url, credentials));
//! let mut engine = Engine::start(queue, remote);
//!
//! // Capture a record while offline
//! engine.enqueue(&RecordDraft::new("beneficiaries", "A-123"))?;
//!
//! // Connectivity comes back; the drain loop picks everything up
//! engine.monitor().report_online();
//! ```
//!
//! Must be started inside a tokio runtime; `start` spawns the drain task.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::models::{ConnectivityState, LocalId, PendingRecord, RecordDraft, RecordEvent};
use crate::monitor::ConnectivityMonitor;
use crate::orchestrator::{spawn_drain_task, DrainError, DrainReport, SyncOrchestrator};
use crate::queue::{DurableQueue, QueueResult};
use crate::remote::RemoteAuthority;

/// Offline-first reconciliation engine
pub struct Engine<R> {
    queue: Arc<DurableQueue>,
    monitor: ConnectivityMonitor,
    orchestrator: Arc<SyncOrchestrator<R>>,
    events: Option<mpsc::UnboundedReceiver<RecordEvent>>,
    drain_task: JoinHandle<()>,
}

impl<R: RemoteAuthority + 'static> Engine<R> {
    /// Wire up the engine and spawn its drain loop
    pub fn start(queue: DurableQueue, remote: Arc<R>) -> Self {
        let queue = Arc::new(queue);
        let (monitor, trigger_rx) = ConnectivityMonitor::new();
        let (orchestrator, events) = SyncOrchestrator::new(queue.clone(), remote);
        let orchestrator = Arc::new(orchestrator);
        let drain_task = spawn_drain_task(orchestrator.clone(), trigger_rx);

        Self {
            queue,
            monitor,
            orchestrator,
            events: Some(events),
            drain_task,
        }
    }

    /// Capture a record locally; call this when a write is attempted while
    /// offline
    pub fn enqueue(&self, draft: &RecordDraft) -> QueueResult<LocalId> {
        self.queue.enqueue(draft)
    }

    /// Snapshot of records still pending reconciliation
    pub fn list_pending(&self) -> QueueResult<Vec<PendingRecord>> {
        self.queue.list_pending()
    }

    /// The connectivity monitor; feed environment probes into it
    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    /// Current connectivity, as a subscribable watch channel
    pub fn connectivity(&self) -> watch::Receiver<ConnectivityState> {
        self.monitor.subscribe()
    }

    /// Request a drain, e.g. right after a successful login.
    ///
    /// Coalesced: if a drain is already running, at most one follow-up
    /// drain is queued behind it.
    pub fn trigger_drain(&self) {
        self.monitor.kick();
    }

    /// Run one drain inline and wait for its report.
    ///
    /// Serialized against the background loop; the two never drain
    /// concurrently.
    pub async fn drain_now(&self) -> Result<DrainReport, DrainError> {
        self.orchestrator.drain().await
    }

    /// Take the per-record outcome stream (can only be taken once)
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<RecordEvent>> {
        self.events.take()
    }

    /// Stop the drain loop and wait for it to finish.
    ///
    /// In-flight submissions are abandoned; anything not yet marked synced
    /// stays pending and is retried by the next engine instance.
    pub async fn shutdown(self) {
        let Engine {
            monitor,
            drain_task,
            ..
        } = self;
        // Dropping the monitor closes the trigger channel; the loop exits
        // after its current drain
        drop(monitor);
        let _ = drain_task.await;
    }
}
