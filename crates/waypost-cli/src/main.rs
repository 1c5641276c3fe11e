//! Waypost CLI
//!
//! Command-line interface for Waypost - offline-first record capture
//! and reconciliation.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use waypost_core::{Config, DurableQueue};

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "waypost")]
#[command(about = "Waypost - capture records offline, reconcile when connectivity returns")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture a record into the local queue
    #[command(alias = "create")]
    Add {
        /// Collection the record belongs to (e.g. beneficiaries)
        collection: String,
        /// Business key the server enforces uniqueness on (e.g. A-123)
        business_key: String,
        /// Payload fields as name=value pairs
        #[arg(short = 'f', long = "field", value_parser = parse_field)]
        fields: Vec<(String, Value)>,
    },
    /// List records awaiting reconciliation
    #[command(alias = "ls")]
    Pending {
        /// Filter by collection
        #[arg(short, long)]
        collection: Option<String>,
    },
    /// Drain pending records against the remote authority
    Sync,
    /// Show queue and configuration status
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, api_url, api_token, actor)
        key: String,
        /// Configuration value ('none' to clear)
        value: String,
    },
}

/// Parse a `name=value` payload field. The value is taken as JSON when it
/// parses as JSON, a plain string otherwise, so `-f age=34` stays a number.
fn parse_field(input: &str) -> Result<(String, Value), String> {
    let (name, raw) = input
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{input}'"))?;
    if name.is_empty() {
        return Err(format!("field name missing in '{input}'"));
    }

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((name.to_string(), value))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .try_init();

    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands don't need the queue
    if let Commands::Config { command } = cli.command {
        return match command.unwrap_or(ConfigCommands::Show) {
            ConfigCommands::Show => commands::config::show(&output),
            ConfigCommands::Set { key, value } => commands::config::set(key, value, &output),
        };
    }

    let config = Config::load().context("Failed to load configuration")?;
    let queue = DurableQueue::open(&config).context("Failed to open local queue")?;

    match cli.command {
        Commands::Add {
            collection,
            business_key,
            fields,
        } => commands::record::add(&queue, collection, business_key, fields, &output),
        Commands::Pending { collection } => commands::record::pending(&queue, collection, &output),
        Commands::Sync => commands::sync::run(&config, queue, &output).await,
        Commands::Status => commands::status::show(&config, &queue, &output),
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field_string_and_json() {
        let (name, value) = parse_field("full_name=Alice").unwrap();
        assert_eq!(name, "full_name");
        assert_eq!(value, Value::String("Alice".to_string()));

        let (name, value) = parse_field("age=34").unwrap();
        assert_eq!(name, "age");
        assert_eq!(value, Value::from(34));

        // '=' in the value is preserved
        let (_, value) = parse_field("note=a=b").unwrap();
        assert_eq!(value, Value::String("a=b".to_string()));
    }

    #[test]
    fn test_parse_field_rejects_malformed() {
        assert!(parse_field("no-equals").is_err());
        assert!(parse_field("=value").is_err());
    }

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
