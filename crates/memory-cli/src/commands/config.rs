//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use memory_core::Config;

use crate::output::{Output, OutputFormat};

/// Keys accepted by `memory config set`
const KEYS: &str = "data_dir, editor, max_name_len, default_limit, truncate_at, log_file";

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "editor": config.editor,
                    "max_name_len": config.max_name_len,
                    "default_limit": config.default_limit,
                    "truncate_at": config.truncate_at,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:      {}", config.data_dir.display());
            println!(
                "  editor:        {}",
                config.editor.as_deref().unwrap_or("(not set)")
            );
            println!("  max_name_len:  {}", config.max_name_len);
            println!("  default_limit: {}", config.default_limit);
            println!("  truncate_at:   {}", config.truncate_at);
            println!(
                "  log_file:      {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

/// Apply one `key = value` change to a config
fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let unset = value.is_empty() || value == "none";
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "editor" => {
            config.editor = if unset { None } else { Some(value.to_string()) };
        }
        "max_name_len" => {
            config.max_name_len = parse_positive(key, value)?;
        }
        "default_limit" => {
            config.default_limit = parse_positive(key, value)?;
        }
        "truncate_at" => {
            config.truncate_at = parse_positive(key, value)?;
        }
        "log_file" => {
            config.log_file = if unset { None } else { Some(value.into()) };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: {}",
                key,
                KEYS
            );
        }
    }
    Ok(())
}

fn parse_positive(key: &str, value: &str) -> Result<usize> {
    let n: usize = value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for {}. Use a positive number.", key))?;
    if n == 0 {
        bail!("Invalid value for {}. Use a positive number.", key);
    }
    Ok(n)
}
