//! Local durable queue
//!
//! Persists records captured while disconnected, tagged with a
//! synchronization state, in SQLite. Survives process restarts: once
//! `enqueue` returns, the record is on disk; once `mark_synced` returns,
//! the record will never be re-submitted by a future drain.
//!
//! All operations are linearizable with respect to each other (a mutex
//! around the connection). The lock is never held across a network call;
//! the orchestrator reads a snapshot, releases, submits, and re-acquires
//! only to write back the new state.

mod error;
mod schema;

pub use error::{QueueError, QueueResult};
pub use schema::{init_schema, SCHEMA_VERSION};

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::Config;
use crate::models::{LocalId, PendingRecord, RecordDraft, SyncState};

/// SQLite-backed durable queue for records captured offline
pub struct DurableQueue {
    conn: Mutex<Connection>,
}

impl DurableQueue {
    /// Open the queue at the configured database path
    pub fn open(config: &Config) -> QueueResult<Self> {
        Self::open_at(&config.sqlite_path())
    }

    /// Open the queue at a specific path, initializing the schema if needed
    pub fn open_at(path: &Path) -> QueueResult<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory queue. No durability; intended for tests.
    pub fn open_in_memory() -> QueueResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> QueueResult<Self> {
        if schema::needs_init(&conn) {
            schema::init_schema(&conn)?;
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A poisoned lock means a panic mid-statement; the connection
        // itself is still usable.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Persist a new record with `sync_state = Pending`.
    ///
    /// Fails with [`QueueError::DuplicateKey`] if a pending record with the
    /// same `(collection, business_key)` already exists. Durable before
    /// this returns.
    pub fn enqueue(&self, draft: &RecordDraft) -> QueueResult<LocalId> {
        let payload = serde_json::to_string(&draft.payload).map_err(|e| {
            QueueError::CorruptPayload {
                local_id: 0,
                details: e.to_string(),
            }
        })?;

        let conn = self.conn();
        let result = conn.execute(
            "INSERT INTO records (collection, business_key, payload, sync_state, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                draft.collection,
                draft.business_key,
                payload,
                SyncState::Pending.as_i64(),
                Utc::now().timestamp(),
            ],
        );

        match result {
            Ok(_) => {
                let id = LocalId(conn.last_insert_rowid());
                debug!(
                    local_id = id.0,
                    collection = %draft.collection,
                    business_key = %draft.business_key,
                    "record enqueued"
                );
                Ok(id)
            }
            Err(e) if e.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) => {
                Err(QueueError::DuplicateKey {
                    collection: draft.collection.clone(),
                    business_key: draft.business_key.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Snapshot of all records currently `Pending`.
    ///
    /// No ordering is promised between independent business keys.
    pub fn list_pending(&self) -> QueueResult<Vec<PendingRecord>> {
        self.query_records("WHERE sync_state = 0", &[])
    }

    /// Get a record by local id
    pub fn get(&self, id: LocalId) -> QueueResult<Option<PendingRecord>> {
        let mut records = self.query_records("WHERE id = ?1", &[&id.0])?;
        Ok(records.pop())
    }

    /// Transition a record to `Synced`.
    ///
    /// Idempotent: calling it on an already-synced or unknown id is a
    /// no-op, not an error. A retried drain whose earlier response was
    /// lost must not fail the reconciliation loop here.
    pub fn mark_synced(&self, id: LocalId) -> QueueResult<()> {
        let changed = self.conn().execute(
            "UPDATE records SET sync_state = 1, last_rejection = NULL
             WHERE id = ?1 AND sync_state = 0",
            params![id.0],
        )?;
        if changed > 0 {
            debug!(local_id = id.0, "record marked synced");
        }
        Ok(())
    }

    /// Persist the reason the remote authority rejected a record.
    ///
    /// The record stays `Pending`; the reason survives restarts so the
    /// caller can tell "waiting for network" from "needs attention".
    pub fn record_rejection(&self, id: LocalId, reason: &str) -> QueueResult<()> {
        self.conn().execute(
            "UPDATE records SET last_rejection = ?2
             WHERE id = ?1 AND sync_state = 0",
            params![id.0, reason],
        )?;
        Ok(())
    }

    /// Number of records still pending
    pub fn pending_count(&self) -> QueueResult<i64> {
        let count = self.conn().query_row(
            "SELECT COUNT(*) FROM records WHERE sync_state = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Number of records already synced
    pub fn synced_count(&self) -> QueueResult<i64> {
        let count = self.conn().query_row(
            "SELECT COUNT(*) FROM records WHERE sync_state = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn query_records(
        &self,
        filter: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> QueueResult<Vec<PendingRecord>> {
        let conn = self.conn();
        let sql = format!(
            "SELECT id, collection, business_key, payload, sync_state, last_rejection, created_at
             FROM records {filter}"
        );
        let mut stmt = conn.prepare(&sql)?;

        let rows: Vec<RawRecord> = stmt
            .query_map(params, |row| {
                Ok(RawRecord {
                    id: row.get(0)?,
                    collection: row.get(1)?,
                    business_key: row.get(2)?,
                    payload: row.get(3)?,
                    sync_state: row.get(4)?,
                    last_rejection: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<_>>()?;

        rows.into_iter().map(RawRecord::into_record).collect()
    }
}

/// Row as stored, before the payload is parsed back into JSON
struct RawRecord {
    id: i64,
    collection: String,
    business_key: String,
    payload: String,
    sync_state: i64,
    last_rejection: Option<String>,
    created_at: i64,
}

impl RawRecord {
    fn into_record(self) -> QueueResult<PendingRecord> {
        let payload: Map<String, Value> =
            serde_json::from_str(&self.payload).map_err(|e| QueueError::CorruptPayload {
                local_id: self.id,
                details: e.to_string(),
            })?;

        Ok(PendingRecord {
            local_id: LocalId(self.id),
            collection: self.collection,
            business_key: self.business_key,
            payload,
            sync_state: SyncState::from_i64(self.sync_state),
            last_rejection: self.last_rejection,
            created_at: DateTime::from_timestamp(self.created_at, 0)
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn draft(key: &str) -> RecordDraft {
        RecordDraft::new("beneficiaries", key).field("full_name", "Alice")
    }

    #[test]
    fn test_enqueue_and_list_pending() {
        let queue = DurableQueue::open_in_memory().unwrap();

        let id = queue.enqueue(&draft("A-1")).unwrap();

        let pending = queue.list_pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].local_id, id);
        assert_eq!(pending[0].business_key, "A-1");
        assert_eq!(pending[0].sync_state, SyncState::Pending);
        assert_eq!(pending[0].payload["full_name"], "Alice");
        assert!(pending[0].last_rejection.is_none());
    }

    #[test]
    fn test_duplicate_pending_key_rejected() {
        let queue = DurableQueue::open_in_memory().unwrap();

        queue.enqueue(&draft("A-1")).unwrap();
        let err = queue.enqueue(&draft("A-1")).unwrap_err();

        assert!(matches!(err, QueueError::DuplicateKey { .. }));
        // The pending set is unchanged
        assert_eq!(queue.pending_count().unwrap(), 1);
    }

    #[test]
    fn test_same_key_allowed_in_other_collection() {
        let queue = DurableQueue::open_in_memory().unwrap();

        queue.enqueue(&draft("X-1")).unwrap();
        queue
            .enqueue(&RecordDraft::new("inventory", "X-1").field("item_name", "Frames"))
            .unwrap();

        assert_eq!(queue.pending_count().unwrap(), 2);
    }

    #[test]
    fn test_mark_synced_removes_from_pending() {
        let queue = DurableQueue::open_in_memory().unwrap();

        let id = queue.enqueue(&draft("A-1")).unwrap();
        queue.mark_synced(id).unwrap();

        assert!(queue.list_pending().unwrap().is_empty());
        assert_eq!(queue.synced_count().unwrap(), 1);

        let record = queue.get(id).unwrap().unwrap();
        assert_eq!(record.sync_state, SyncState::Synced);
    }

    #[test]
    fn test_mark_synced_is_idempotent() {
        let queue = DurableQueue::open_in_memory().unwrap();

        let id = queue.enqueue(&draft("A-1")).unwrap();
        queue.mark_synced(id).unwrap();
        queue.mark_synced(id).unwrap();

        // Unknown id is also a no-op
        queue.mark_synced(LocalId(9999)).unwrap();

        assert_eq!(queue.synced_count().unwrap(), 1);
    }

    #[test]
    fn test_key_reusable_after_sync() {
        let queue = DurableQueue::open_in_memory().unwrap();

        let id = queue.enqueue(&draft("A-1")).unwrap();
        queue.mark_synced(id).unwrap();

        // The key is free again once the earlier record is synced
        queue.enqueue(&draft("A-1")).unwrap();
        assert_eq!(queue.pending_count().unwrap(), 1);
    }

    #[test]
    fn test_record_rejection_persists_reason() {
        let queue = DurableQueue::open_in_memory().unwrap();

        let id = queue.enqueue(&draft("A-1")).unwrap();
        queue.record_rejection(id, "age must be a number").unwrap();

        let record = queue.get(id).unwrap().unwrap();
        assert_eq!(record.sync_state, SyncState::Pending);
        assert_eq!(record.last_rejection.as_deref(), Some("age must be a number"));
        assert!(record.needs_attention());

        // Syncing clears the flag
        queue.mark_synced(id).unwrap();
        let record = queue.get(id).unwrap().unwrap();
        assert!(record.last_rejection.is_none());
    }

    #[test]
    fn test_rejection_on_synced_record_is_noop() {
        let queue = DurableQueue::open_in_memory().unwrap();

        let id = queue.enqueue(&draft("A-1")).unwrap();
        queue.mark_synced(id).unwrap();
        queue.record_rejection(id, "late rejection").unwrap();

        let record = queue.get(id).unwrap().unwrap();
        assert!(record.last_rejection.is_none());
    }

    #[test]
    fn test_records_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("waypost.db");

        // Capture a record, then drop the queue (simulated crash/restart)
        {
            let queue = DurableQueue::open_at(&path).unwrap();
            queue
                .enqueue(&RecordDraft::new("beneficiaries", "A-3").field("full_name", "Carol"))
                .unwrap();
        }

        let queue = DurableQueue::open_at(&path).unwrap();
        let pending = queue.list_pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].business_key, "A-3");
        assert_eq!(pending[0].payload["full_name"], "Carol");
    }

    #[test]
    fn test_synced_state_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("waypost.db");

        {
            let queue = DurableQueue::open_at(&path).unwrap();
            let id = queue.enqueue(&draft("A-1")).unwrap();
            queue.mark_synced(id).unwrap();
        }

        // A synced record is never offered to a future drain
        let queue = DurableQueue::open_at(&path).unwrap();
        assert!(queue.list_pending().unwrap().is_empty());
        assert_eq!(queue.synced_count().unwrap(), 1);
    }

    #[test]
    fn test_rejection_reason_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("waypost.db");

        {
            let queue = DurableQueue::open_at(&path).unwrap();
            let id = queue.enqueue(&draft("A-1")).unwrap();
            queue.record_rejection(id, "age must be a number").unwrap();
        }

        let queue = DurableQueue::open_at(&path).unwrap();
        let pending = queue.list_pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert!(pending[0].needs_attention());
        assert_eq!(
            pending[0].last_rejection.as_deref(),
            Some("age must be a number")
        );
    }

    #[test]
    fn test_get_unknown_id() {
        let queue = DurableQueue::open_in_memory().unwrap();
        assert!(queue.get(LocalId(42)).unwrap().is_none());
    }
}
