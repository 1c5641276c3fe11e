//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use waypost_core::PendingRecord;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an error attached to a specific record
    pub fn record_error(&self, business_key: &str, message: &str) {
        match self.format {
            OutputFormat::Human => eprintln!("✗ {}: {}", business_key, message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "status": "rejected",
                        "business_key": business_key,
                        "message": message
                    })
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print one queued record as a table row
    pub fn print_record(&self, record: &PendingRecord) {
        match self.format {
            OutputFormat::Human => {
                let note = match &record.last_rejection {
                    Some(reason) => format!("needs attention: {}", reason),
                    None => String::new(),
                };
                println!(
                    "{:<14} {:<16} {:<8} {:<17} {}",
                    record.business_key,
                    record.collection,
                    record.sync_state,
                    record.created_at.format("%Y-%m-%d %H:%M"),
                    note
                );
            }
            OutputFormat::Json => {
                if let Ok(json) = serde_json::to_string(record) {
                    println!("{}", json);
                }
            }
            OutputFormat::Quiet => {
                println!("{}", record.business_key);
            }
        }
    }
}
