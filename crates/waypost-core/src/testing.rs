//! In-process remote authorities used by tests.
//!
//! None of these touch the network; they implement [`RemoteAuthority`]
//! directly so orchestrator and engine behavior can be exercised without a
//! live backend.

use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use tokio::sync::Semaphore;

use crate::models::SyncAttemptResult;
use crate::remote::{OutboundRecord, RemoteAuthority};

/// Returns scripted outcomes per business key, recording every call.
///
/// Keys with no scripted outcomes get `Accepted`.
pub(crate) struct ScriptedRemote {
    outcomes: Mutex<HashMap<String, VecDeque<SyncAttemptResult>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRemote {
    pub(crate) fn new() -> Self {
        Self {
            outcomes: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue the outcome of the next create for `business_key`
    pub(crate) fn script(&self, business_key: &str, outcome: SyncAttemptResult) {
        self.outcomes
            .lock()
            .unwrap()
            .entry(business_key.to_string())
            .or_default()
            .push_back(outcome);
    }

    /// Business keys submitted so far, in order
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl RemoteAuthority for ScriptedRemote {
    fn create(&self, record: OutboundRecord) -> impl Future<Output = SyncAttemptResult> + Send {
        self.calls.lock().unwrap().push(record.business_key.clone());
        let result = self
            .outcomes
            .lock()
            .unwrap()
            .get_mut(&record.business_key)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(SyncAttemptResult::Accepted);
        async move { result }
    }
}

/// Behaves like a real backend with a uniqueness constraint: the first
/// create of a key commits it, later creates of the same key conflict.
///
/// With `lose_responses(true)` a create still commits server-side but the
/// client sees a transient failure, simulating a response lost after the
/// server durably wrote the record (the at-least-once case).
pub(crate) struct InMemoryAuthority {
    keys: Mutex<HashSet<(String, String)>>,
    lose_responses: AtomicBool,
}

impl InMemoryAuthority {
    pub(crate) fn new() -> Self {
        Self {
            keys: Mutex::new(HashSet::new()),
            lose_responses: AtomicBool::new(false),
        }
    }

    pub(crate) fn lose_responses(&self, lose: bool) {
        self.lose_responses.store(lose, Ordering::SeqCst);
    }

    /// Pretend the server already has this key, e.g. from another device
    pub(crate) fn preload(&self, collection: &str, business_key: &str) {
        self.keys
            .lock()
            .unwrap()
            .insert((collection.to_string(), business_key.to_string()));
    }

    /// Number of records the server has committed
    pub(crate) fn record_count(&self) -> usize {
        self.keys.lock().unwrap().len()
    }
}

impl RemoteAuthority for InMemoryAuthority {
    fn create(&self, record: OutboundRecord) -> impl Future<Output = SyncAttemptResult> + Send {
        let key = (record.collection.clone(), record.business_key.clone());
        let result = {
            let mut keys = self.keys.lock().unwrap();
            if keys.contains(&key) {
                SyncAttemptResult::AlreadyExists
            } else {
                keys.insert(key);
                if self.lose_responses.load(Ordering::SeqCst) {
                    SyncAttemptResult::TransientFailure {
                        message: "response lost in transit".to_string(),
                    }
                } else {
                    SyncAttemptResult::Accepted
                }
            }
        };
        async move { result }
    }
}

/// Wraps [`InMemoryAuthority`] behind a gate so a drain can be held
/// mid-flight, and tracks how many creates ever ran concurrently.
pub(crate) struct GatedRemote {
    pub(crate) inner: InMemoryAuthority,
    gate: Semaphore,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl GatedRemote {
    pub(crate) fn new() -> Self {
        Self {
            inner: InMemoryAuthority::new(),
            gate: Semaphore::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Let `n` gated creates proceed
    pub(crate) fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

impl RemoteAuthority for GatedRemote {
    fn create(&self, record: OutboundRecord) -> impl Future<Output = SyncAttemptResult> + Send {
        async move {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let permit = self.gate.acquire().await.unwrap();
            permit.forget();

            let result = self.inner.create(record).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }
}
