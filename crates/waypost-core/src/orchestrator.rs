//! Sync orchestrator
//!
//! Drains the durable queue against the remote authority. One drain takes
//! a snapshot of the pending records, submits each one, and classifies the
//! outcome:
//!
//! - `Accepted` and `AlreadyExists` both mark the record synced — a
//!   uniqueness conflict means an earlier attempt reached the server but
//!   its response was lost, so the retry already succeeded
//! - `TransientFailure` leaves the record pending for the next drain
//! - `RejectedByServer` leaves the record pending, persists the reason,
//!   and emits an actionable event; the record is never dropped silently
//!
//! One record's failure never aborts the rest of the drain. Queue-level
//! errors do: continuing against a broken queue risks double-submission.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::models::{RecordEvent, SyncAttemptResult};
use crate::monitor::DrainTrigger;
use crate::queue::{DurableQueue, QueueError};
use crate::remote::{OutboundRecord, RemoteAuthority};

/// Errors that abort a drain
#[derive(Error, Debug)]
pub enum DrainError {
    /// The queue failed mid-drain; records already marked stay marked,
    /// the rest remain pending and are retried on the next trigger
    #[error("queue failure during drain: {0}")]
    Queue(#[from] QueueError),
}

/// Summary of one drain pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Records in the snapshot this drain attempted
    pub attempted: usize,
    /// Records confirmed by the remote authority (created or conflict)
    pub synced: usize,
    /// Records left pending after a transient failure
    pub still_pending: usize,
    /// Records rejected by the server and flagged for attention
    pub rejected: usize,
}

/// Drives reconciliation between the queue and the remote authority
pub struct SyncOrchestrator<R> {
    queue: Arc<DurableQueue>,
    remote: Arc<R>,
    event_tx: mpsc::UnboundedSender<RecordEvent>,
    /// Serializes drains; a caller-invoked drain and the trigger loop
    /// must never run concurrently against the same queue
    drain_lock: Mutex<()>,
}

impl<R: RemoteAuthority> SyncOrchestrator<R> {
    /// Create an orchestrator and the event stream it reports outcomes on
    pub fn new(
        queue: Arc<DurableQueue>,
        remote: Arc<R>,
    ) -> (Self, mpsc::UnboundedReceiver<RecordEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        (
            Self {
                queue,
                remote,
                event_tx,
                drain_lock: Mutex::new(()),
            },
            event_rx,
        )
    }

    /// Run one complete drain pass.
    ///
    /// Terminates after every record in the initial snapshot has been
    /// attempted once; records enqueued mid-drain wait for the next
    /// trigger.
    pub async fn drain(&self) -> Result<DrainReport, DrainError> {
        let _guard = self.drain_lock.lock().await;

        let snapshot = self.queue.list_pending()?;
        if snapshot.is_empty() {
            debug!("nothing pending, drain is a no-op");
            return Ok(DrainReport::default());
        }

        info!(records = snapshot.len(), "drain started");
        let mut report = DrainReport::default();

        for record in &snapshot {
            report.attempted += 1;

            // The queue lock is not held here; only the outbound copy
            // travels with the request
            let outbound = OutboundRecord::from_record(record);
            let result = self.remote.create(outbound).await;
            let was_conflict = matches!(result, SyncAttemptResult::AlreadyExists);

            match result {
                SyncAttemptResult::Accepted | SyncAttemptResult::AlreadyExists => {
                    if was_conflict {
                        debug!(
                            business_key = %record.business_key,
                            "key already on server, normalizing to success"
                        );
                    }
                    self.queue.mark_synced(record.local_id)?;
                    report.synced += 1;
                    self.emit(RecordEvent::Synced {
                        local_id: record.local_id,
                        business_key: record.business_key.clone(),
                    });
                }
                SyncAttemptResult::TransientFailure { message } => {
                    debug!(
                        business_key = %record.business_key,
                        %message,
                        "transient failure, record stays pending"
                    );
                    report.still_pending += 1;
                    self.emit(RecordEvent::StillPending {
                        local_id: record.local_id,
                        business_key: record.business_key.clone(),
                        reason: message,
                    });
                }
                SyncAttemptResult::RejectedByServer { status, message } => {
                    warn!(
                        business_key = %record.business_key,
                        status,
                        %message,
                        "record rejected by server, needs attention"
                    );
                    self.queue.record_rejection(record.local_id, &message)?;
                    report.rejected += 1;
                    self.emit(RecordEvent::Rejected {
                        local_id: record.local_id,
                        business_key: record.business_key.clone(),
                        status,
                        message,
                    });
                }
            }
        }

        info!(
            attempted = report.attempted,
            synced = report.synced,
            still_pending = report.still_pending,
            rejected = report.rejected,
            "drain complete"
        );
        Ok(report)
    }

    fn emit(&self, event: RecordEvent) {
        // Nobody listening is fine
        let _ = self.event_tx.send(event);
    }
}

/// Spawn the drain loop.
///
/// Consumes the monitor's trigger channel one trigger at a time, so drains
/// never overlap and a trigger that arrives mid-drain runs one follow-up
/// drain afterwards. Exits when the monitor (the sending side) is dropped.
pub fn spawn_drain_task<R>(
    orchestrator: Arc<SyncOrchestrator<R>>,
    mut trigger_rx: mpsc::Receiver<DrainTrigger>,
) -> JoinHandle<()>
where
    R: RemoteAuthority + 'static,
{
    tokio::spawn(async move {
        while let Some(trigger) = trigger_rx.recv().await {
            debug!(?trigger, "drain trigger received");
            if let Err(e) = orchestrator.drain().await {
                // Reported, not swallowed; the next trigger retries
                warn!("drain aborted: {e}");
            }
        }
        debug!("trigger channel closed, drain task exiting");
    })
}
