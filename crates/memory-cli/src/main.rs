//! Memory CLI
//!
//! Command-line interface for Memory - a personal knowledge base of linked
//! notes, events, people, places and things.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use memory_core::{Config, EntryType, JsonPersistence, MemoryError, StorageError};

mod commands;
mod editor;
mod output;

use commands::entry::AddArgs;
use commands::list::ListArgs;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "memory")]
#[command(about = "Memory - personal knowledge base of linked entries")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new entry
    Add(AddArgs),
    /// Show an entry
    Show {
        /// Entry name
        name: String,
        /// Only match an entry of this type
        #[arg(short = 'T', long = "type")]
        entry_type: Option<EntryType>,
    },
    /// Edit an entry in your editor
    Edit {
        /// Entry name
        name: String,
        /// Only match an entry of this type
        #[arg(short = 'T', long = "type")]
        entry_type: Option<EntryType>,
    },
    /// Delete an entry
    #[command(alias = "rm")]
    Delete {
        /// Entry name
        name: String,
        /// Only match an entry of this type
        #[arg(short = 'T', long = "type")]
        entry_type: Option<EntryType>,
        /// Don't ask for confirmation
        #[arg(short, long)]
        force: bool,
    },
    /// List entries
    #[command(alias = "ls")]
    List(ListArgs),
    /// Show links to and from an entry
    Links {
        /// Entry name
        name: String,
        /// Only match an entry of this type
        #[arg(short = 'T', long = "type")]
        entry_type: Option<EntryType>,
    },
    /// List all tags
    Tags,
    /// Show entry counts and storage location
    Status,
    /// Check link consistency
    Check {
        /// Rebuild backlinks from outgoing links
        #[arg(long)]
        repair: bool,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

impl Commands {
    /// Whether the command changes the store and must be saved
    fn is_write(&self) -> bool {
        matches!(
            self,
            Commands::Add(_)
                | Commands::Edit { .. }
                | Commands::Delete { .. }
                | Commands::Check { repair: true }
        )
    }
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, editor, max_name_len, default_limit, truncate_at, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands don't need the store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    init_logging(&config);

    let persistence = JsonPersistence::new(config);
    let mut store = match persistence.open_store() {
        Ok(store) => store,
        Err(e) => {
            if let MemoryError::Storage(ref storage) = e {
                print_hint(storage);
            }
            return Err(e).with_context(|| {
                format!(
                    "Failed to open entries from {}",
                    persistence.config().data_path().display()
                )
            });
        }
    };

    let is_write = cli.command.is_write();
    let config = persistence.config();

    let result = match cli.command {
        Commands::Add(args) => commands::entry::add(&mut store, config, args, &output),
        Commands::Show { name, entry_type } => {
            commands::entry::show(&store, name, entry_type, &output)
        }
        Commands::Edit { name, entry_type } => {
            commands::entry::edit(&mut store, config, name, entry_type, &output)
        }
        Commands::Delete {
            name,
            entry_type,
            force,
        } => commands::entry::delete(&mut store, name, entry_type, force, &output),
        Commands::List(args) => {
            commands::list::list(&store, &args, config.truncate_at, &output)
        }
        Commands::Links { name, entry_type } => {
            commands::links::show(&store, name, entry_type, &output)
        }
        Commands::Tags => commands::tags::list(&store, &output),
        Commands::Status => commands::status::show(&store, &persistence, &output),
        Commands::Check { repair } => commands::check::check(&mut store, repair, &output),
        Commands::Config { .. } => Ok(()), // Handled above
    };

    // Save once after a successful mutation
    if is_write && result.is_ok() {
        if let Err(e) = persistence.save_store(&store) {
            print_hint(&e);
            return Err(e).with_context(|| {
                format!("Failed to save entries to {}", config.data_path().display())
            });
        }
        info!(entries = store.count(), "saved entries");
    }

    result
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Print the recovery suggestion for a storage failure, if there is one
fn print_hint(err: &StorageError) {
    if let Some(suggestion) = err.recovery_suggestion() {
        eprintln!("Hint: {}", suggestion);
    }
}

/// Initialize logging
///
/// Only initializes if MEMORY_LOG environment variable is set.
/// Logs to file (config.log_file or default {data_dir}/debug.log).
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("MEMORY_LOG") else {
        return;
    };

    let log_path = config.log_path();

    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(format!(
        "memory_core={},memory_cli={}",
        log_level, log_level
    ));

    // Ignore the error if a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    info!("logging initialized to {:?}", log_path);
}
