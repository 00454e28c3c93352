//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/memory/config.toml)
//! 3. Environment variables (MEMORY_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix
const ENV_PREFIX: &str = "MEMORY";

/// Default maximum entry name length
pub const DEFAULT_MAX_NAME_LEN: usize = 50;

/// Default ceiling for queries that ask for no limit
pub const DEFAULT_LIMIT: usize = 999;

/// Default display truncation length
pub const DEFAULT_TRUNCATE_AT: usize = 300;

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the data file and recovered edits
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Command used to edit entries (falls back to $EDITOR / $VISUAL)
    #[serde(default)]
    pub editor: Option<String>,

    /// Maximum length of an entry name, in characters
    #[serde(default = "default_max_name_len")]
    pub max_name_len: usize,

    /// Number of results returned when no limit is given
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Length at which long values are truncated for display
    #[serde(default = "default_truncate_at")]
    pub truncate_at: usize,

    /// Log file path (defaults to {data_dir}/debug.log when logging is on)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            editor: None,
            max_name_len: DEFAULT_MAX_NAME_LEN,
            default_limit: DEFAULT_LIMIT,
            truncate_at: DEFAULT_TRUNCATE_AT,
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (MEMORY_DATA_DIR, MEMORY_EDITOR, MEMORY_MAX_NAME_LEN)
    /// 2. Config file (~/.config/memory/config.toml or MEMORY_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_path(p),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // MEMORY_DATA_DIR
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        // MEMORY_EDITOR
        if let Ok(val) = std::env::var(format!("{}_EDITOR", ENV_PREFIX)) {
            self.editor = if val.is_empty() { None } else { Some(val) };
        }

        // MEMORY_MAX_NAME_LEN (ignored unless a positive number)
        if let Ok(val) = std::env::var(format!("{}_MAX_NAME_LEN", ENV_PREFIX)) {
            if let Ok(n) = val.trim().parse::<usize>() {
                if n > 0 {
                    self.max_name_len = n;
                }
            }
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to the default config file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with MEMORY_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("memory")
            .join("config.toml")
    }

    /// Get the path to the entry data file
    pub fn data_path(&self) -> PathBuf {
        self.data_dir.join("memory.json")
    }

    /// Directory where unparseable edits are kept
    pub fn recovery_dir(&self) -> PathBuf {
        self.data_dir.join("recovered")
    }

    /// Log file, defaulting into the data directory
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("debug.log"))
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("memory")
}

fn default_max_name_len() -> usize {
    DEFAULT_MAX_NAME_LEN
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

fn default_truncate_at() -> usize {
    DEFAULT_TRUNCATE_AT
}
