//! Config command handlers

use anyhow::{bail, Context, Result};

use waypost_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(output: &Output) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "api_url": config.api_url,
                    "api_token": config.api_token.as_ref().map(|_| "(set)"),
                    "actor": config.actor
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  data_dir:  {}", config.data_dir.display());
            println!(
                "  api_url:   {}",
                config.api_url.as_deref().unwrap_or("(not set)")
            );
            println!(
                "  api_token: {}",
                if config.api_token.is_some() {
                    "(set)"
                } else {
                    "(not set)"
                }
            );
            println!(
                "  actor:     {}",
                config.actor.as_deref().unwrap_or("(not set)")
            );
            println!();
            println!("Config file: {}", Config::config_file_path().display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(key: String, value: String, output: &Output) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;

    let cleared = value.is_empty() || value == "none";
    match key.as_str() {
        "data_dir" => {
            config.data_dir = value.clone().into();
        }
        "api_url" => {
            config.api_url = if cleared { None } else { Some(value.clone()) };
        }
        "api_token" => {
            config.api_token = if cleared { None } else { Some(value.clone()) };
        }
        "actor" => {
            config.actor = if cleared { None } else { Some(value.clone()) };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, api_url, api_token, actor",
                key
            );
        }
    }

    config.save().context("Failed to save configuration")?;

    if key == "api_token" && !cleared {
        output.success(&format!("Set {} = (hidden)", key));
    } else {
        output.success(&format!("Set {} = {}", key, value));
    }

    Ok(())
}
