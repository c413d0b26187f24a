//! Config command - inspect and edit the JSON configuration.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;
use serde_json::Value;

use cdset_core::CdsConfig;
use cdset_core::models::field;

use super::config_path;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Write a configuration file with default settings
    Init {
        /// Destination (default: the --config path or the user config dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print one value by dotted key (e.g. "extraction.race_sum_tolerance")
    Get { key: String },

    /// Change one value by dotted key (e.g. "institutions.brown.name")
    Set {
        key: String,
        /// Parsed as JSON, or taken as a string when it is not valid JSON
        value: String,
    },

    /// Print where the configuration file lives
    Path,
}

pub async fn run(args: ConfigArgs, explicit: Option<&str>) -> anyhow::Result<()> {
    let path = config_path(explicit);
    match args.command {
        ConfigCommand::Show => {
            if !path.exists() {
                eprintln!("{} {} not found, using defaults", style("ℹ").blue(), path.display());
            }
            println!("{}", serde_json::to_string_pretty(&read(&path)?)?);
            Ok(())
        }
        ConfigCommand::Init { output, force } => init(&output.unwrap_or(path), force),
        ConfigCommand::Get { key } => {
            let json = serde_json::to_value(read(&path)?)?;
            let value = field::get(&json, &key)
                .ok_or_else(|| anyhow::anyhow!("Configuration key not found: {}", key))?;
            println!("{}", serde_json::to_string_pretty(value)?);
            Ok(())
        }
        ConfigCommand::Set { key, value } => set(&path, &key, &value),
        ConfigCommand::Path => {
            println!("{}", path.display());
            if !path.exists() {
                eprintln!(
                    "{} not created yet, run 'cdset config init'",
                    style("ℹ").yellow()
                );
            }
            Ok(())
        }
    }
}

/// The file at `path`, or defaults when there is none.
fn read(path: &Path) -> anyhow::Result<CdsConfig> {
    if path.exists() {
        Ok(CdsConfig::from_file(path)?)
    } else {
        Ok(CdsConfig::default())
    }
}

fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }
    CdsConfig::default().save(path)?;
    println!("{} Created {}", style("✓").green(), path.display());
    Ok(())
}

fn set(path: &Path, key: &str, raw: &str) -> anyhow::Result<()> {
    let value: Value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));

    let mut json = serde_json::to_value(read(path)?)?;
    field::set(&mut json, key, value.clone()).map_err(|e| anyhow::anyhow!("Cannot set {}: {}", key, e))?;

    let config: CdsConfig =
        serde_json::from_value(json).map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e))?;
    config.validate()?;
    config.save(path)?;

    println!("{} {} = {}", style("✓").green(), key, value);
    Ok(())
}
