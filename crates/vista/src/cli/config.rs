//! The `vista config` command for configuration management.

use anyhow::Context;
use clap::{Args, Subcommand};
use std::path::Path;
use toml_edit::{DocumentMut, Table, Value};
use vista_core::Config;

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Subcommands for configuration management.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,

    /// Show config file path
    Path,

    /// Initialize a new config file with defaults
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Set a single value, keeping the rest of the file (and its comments) intact
    ///
    /// Keys are dotted paths, e.g. `run.tier`, `run.batch`, `tiers.Tier 1.rpm`.
    Set {
        /// Dotted key path
        key: String,

        /// New value; booleans and numbers are detected, anything else is a string
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
}

/// Execute the config command.
pub async fn execute(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let config = Config::load()?;
            let toml = config.to_toml()?;
            println!("{}", toml);
        }

        ConfigCommand::Path => {
            let path = Config::default_path();
            println!("{}", path.display());
        }

        ConfigCommand::Init { force } => {
            let path = Config::default_path();

            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at: {}\nUse --force to overwrite.",
                    path.display()
                );
            }

            // Ensure parent directory exists
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            // Write default config
            let config = Config::default();
            let toml = config.to_toml()?;
            std::fs::write(&path, toml)?;

            tracing::info!("Config file created at: {}", path.display());
            println!("Configuration initialized at: {}", path.display());
        }

        ConfigCommand::Set { key, value } => {
            let path = Config::default_path();
            update_config_file(&path, &key, parse_value(&value))?;
            println!("Set {key} = {value} in {}", path.display());
        }
    }

    Ok(())
}

/// Set `key` in the TOML file at `path`, validating the result before writing.
pub fn update_config_file(path: &Path, key: &str, value: Value) -> anyhow::Result<()> {
    let content = if path.exists() {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    } else {
        String::new()
    };

    let mut doc: DocumentMut = content
        .parse()
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    set_key(&mut doc, key, value)?;

    let updated = doc.to_string();
    Config::from_toml_str(&updated).with_context(|| format!("Refusing to set {key}"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, updated)?;
    tracing::debug!("Updated {} in {}", key, path.display());
    Ok(())
}

/// Interpret a command-line value as bool, integer, float, or string.
pub fn parse_value(raw: &str) -> Value {
    if let Ok(b) = raw.parse::<bool>() {
        return b.into();
    }
    if let Ok(i) = raw.parse::<i64>() {
        return i.into();
    }
    if let Ok(f) = raw.parse::<f64>() {
        return f.into();
    }
    raw.into()
}

fn set_key(doc: &mut DocumentMut, key: &str, value: Value) -> anyhow::Result<()> {
    let parts: Vec<&str> = key.split('.').map(str::trim).collect();
    if parts.iter().any(|part| part.is_empty()) {
        anyhow::bail!("Invalid key '{key}': expected a dotted path like run.tier");
    }
    let Some((last, parents)) = parts.split_last() else {
        anyhow::bail!("Empty key");
    };

    let mut table: &mut Table = doc.as_table_mut();
    for part in parents {
        table = table
            .entry(*part)
            .or_insert(toml_edit::table())
            .as_table_mut()
            .with_context(|| format!("'{part}' in '{key}' is not a table"))?;
    }
    table[*last] = toml_edit::value(value);
    Ok(())
}
