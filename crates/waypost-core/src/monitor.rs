//! Connectivity monitor
//!
//! Tracks the process-wide [`ConnectivityState`] and turns offline→online
//! transitions into drain triggers. Two sources feed it: environment
//! probes (`report_online`/`report_offline`) and caller-initiated kicks
//! (`kick`, e.g. right after login). Both funnel into one bounded trigger
//! channel so the drain task never sees two concurrent requests.
//!
//! The channel has capacity 1 and triggers are sent with `try_send`:
//! a trigger that arrives while a drain is running queues at most one
//! follow-up drain, and extra triggers are coalesced away.

use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::models::ConnectivityState;

/// Why a drain was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainTrigger {
    /// The environment reported an offline→online transition
    OnlineEdge,
    /// The caller asked for a drain explicitly
    Kick,
}

/// Sole writer of the connectivity state, and the only source of drain
/// triggers
pub struct ConnectivityMonitor {
    state: watch::Sender<ConnectivityState>,
    trigger_tx: mpsc::Sender<DrainTrigger>,
}

impl ConnectivityMonitor {
    /// Create a monitor starting in `Offline`.
    ///
    /// Returns the receiving end of the trigger channel; the drain task
    /// consumes it one trigger at a time.
    pub fn new() -> (Self, mpsc::Receiver<DrainTrigger>) {
        // Capacity 1 is what gives trigger coalescing its semantics
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        let (state, _) = watch::channel(ConnectivityState::Offline);

        (Self { state, trigger_tx }, trigger_rx)
    }

    /// Current connectivity state
    pub fn state(&self) -> ConnectivityState {
        *self.state.borrow()
    }

    /// Subscribe to connectivity changes
    pub fn subscribe(&self) -> watch::Receiver<ConnectivityState> {
        self.state.subscribe()
    }

    /// The environment reports the network is available.
    ///
    /// Edge-triggered: fires a drain only when the state actually changes
    /// from offline to online, not on every probe.
    pub fn report_online(&self) {
        let became_online = self.state.send_if_modified(|state| {
            if *state == ConnectivityState::Online {
                false
            } else {
                *state = ConnectivityState::Online;
                true
            }
        });

        if became_online {
            debug!("connectivity changed to online");
            self.fire(DrainTrigger::OnlineEdge);
        }
    }

    /// The environment reports the network is gone
    pub fn report_offline(&self) {
        let changed = self.state.send_if_modified(|state| {
            if *state == ConnectivityState::Offline {
                false
            } else {
                *state = ConnectivityState::Offline;
                true
            }
        });

        if changed {
            debug!("connectivity changed to offline");
        }
    }

    /// Request a drain regardless of connectivity edges.
    ///
    /// Used right after a successful login, when pending records may have
    /// accumulated while no session existed.
    pub fn kick(&self) {
        self.fire(DrainTrigger::Kick);
    }

    fn fire(&self, trigger: DrainTrigger) {
        match self.trigger_tx.try_send(trigger) {
            Ok(()) => debug!(?trigger, "drain trigger queued"),
            Err(mpsc::error::TrySendError::Full(_)) => {
                // A drain is already queued; this trigger is covered by it
                debug!(?trigger, "drain trigger coalesced");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(?trigger, "drain task is gone, trigger dropped");
            }
        }
    }
}
