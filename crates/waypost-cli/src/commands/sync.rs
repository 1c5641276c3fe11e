//! Sync command handler

use std::sync::Arc;

use anyhow::{bail, Result};

use waypost_core::{
    Config, DurableQueue, HttpRemote, RecordEvent, StaticCredentials, SyncOrchestrator,
};

use crate::output::Output;

/// Drain the local queue against the remote authority
pub async fn run(config: &Config, queue: DurableQueue, output: &Output) -> Result<()> {
    let Some(ref api_url) = config.api_url else {
        bail!(
            "API URL not configured. Set it with:\n  \
             waypost config set api_url http://your-server:8000/api/v1"
        );
    };

    let pending = queue.pending_count()?;
    if pending == 0 {
        output.success("Nothing pending - local queue is empty");
        return Ok(());
    }

    let mut credentials = match config.api_token {
        Some(ref token) => StaticCredentials::new(token.as_str()),
        None => StaticCredentials::anonymous(),
    };
    if let Some(ref actor) = config.actor {
        credentials = credentials.with_actor(actor.as_str());
    }

    output.message(&format!("Syncing {} pending record(s) to {}...", pending, api_url));

    let remote = Arc::new(HttpRemote::new(api_url.as_str(), Arc::new(credentials)));
    let (orchestrator, mut events) = SyncOrchestrator::new(Arc::new(queue), remote);

    let report = orchestrator.drain().await?;

    // The drain is done, so the event channel holds the full outcome list
    while let Ok(event) = events.try_recv() {
        match event {
            RecordEvent::Synced { business_key, .. } => {
                output.success(&format!("Synced {}", business_key));
            }
            RecordEvent::StillPending { business_key, reason, .. } => {
                output.message(&format!(
                    "Still pending {} ({}), will retry next sync",
                    business_key, reason
                ));
            }
            RecordEvent::Rejected { business_key, status, message, .. } => {
                output.record_error(&business_key, &format!("rejected ({}): {}", status, message));
            }
        }
    }

    output.message(&format!(
        "\nSync complete: {} synced, {} still pending, {} rejected",
        report.synced, report.still_pending, report.rejected
    ));
    if report.rejected > 0 {
        output.message("Rejected records need attention; see `waypost pending`.");
    }

    Ok(())
}
