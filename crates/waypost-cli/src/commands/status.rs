//! Status command handler

use anyhow::Result;

use waypost_core::{Config, DurableQueue};

use crate::output::{Output, OutputFormat};

/// Show queue and configuration status
pub fn show(config: &Config, queue: &DurableQueue, output: &Output) -> Result<()> {
    let pending = queue.pending_count()?;
    let synced = queue.synced_count()?;
    let flagged = queue
        .list_pending()?
        .iter()
        .filter(|r| r.needs_attention())
        .count();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "queue": {
                        "pending": pending,
                        "synced": synced,
                        "needs_attention": flagged,
                        "database": config.sqlite_path()
                    },
                    "api_url": config.api_url,
                    "actor": config.actor
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", pending);
        }
        OutputFormat::Human => {
            println!("Waypost Status");
            println!("==============");
            println!();
            println!("Queue:");
            println!("  Pending:         {}", pending);
            println!("  Synced:          {}", synced);
            println!("  Needs attention: {}", flagged);
            println!("  Database:        {}", config.sqlite_path().display());
            println!();
            println!("Remote:");
            println!(
                "  API URL: {}",
                config.api_url.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  Actor:   {}",
                config.actor.as_deref().unwrap_or("(not set)")
            );
        }
    }

    Ok(())
}
