//! Record command handlers: capture and inspect queued records

use anyhow::{Context, Result};
use serde_json::Value;

use waypost_core::{DurableQueue, QueueError, RecordDraft};

use crate::output::Output;

/// Capture a record into the local queue
pub fn add(
    queue: &DurableQueue,
    collection: String,
    business_key: String,
    fields: Vec<(String, Value)>,
    output: &Output,
) -> Result<()> {
    let mut draft = RecordDraft::new(collection, business_key);
    for (name, value) in fields {
        draft.payload.insert(name, value);
    }

    match queue.enqueue(&draft) {
        Ok(id) => {
            output.success(&format!(
                "Captured {} ({}), queued for sync as #{}",
                draft.business_key, draft.collection, id
            ));
            Ok(())
        }
        Err(QueueError::DuplicateKey { business_key, .. }) => {
            anyhow::bail!(
                "A record with key '{}' is already waiting to sync.\n\
                 Pick a different key, or wait for the pending record to reconcile.",
                business_key
            );
        }
        Err(e) => Err(e).context("Failed to capture record"),
    }
}

/// List records awaiting reconciliation
pub fn pending(
    queue: &DurableQueue,
    collection: Option<String>,
    output: &Output,
) -> Result<()> {
    let mut records = queue.list_pending().context("Failed to read local queue")?;
    if let Some(ref collection) = collection {
        records.retain(|r| &r.collection == collection);
    }

    if records.is_empty() {
        output.message("Nothing pending.");
        return Ok(());
    }

    for record in &records {
        output.print_record(record);
    }

    if !output.is_quiet() {
        let flagged = records.iter().filter(|r| r.needs_attention()).count();
        if flagged > 0 {
            output.message(&format!(
                "\n{} record(s) were rejected by the server and need attention.",
                flagged
            ));
        }
    }

    Ok(())
}
