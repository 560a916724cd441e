//! rulectl - command-line management for the rule store
//!
//! Opens the configured SQLite database, runs one command, and closes it.

mod rules;

use anyhow::{Context, Result};
use clap::Parser;
use rule_store::{RuleStore, StoreConfig};
use std::path::PathBuf;
use tracing::debug;

use crate::rules::RuleCommands;

#[derive(Parser)]
#[command(name = "rulectl")]
#[command(about = "Manage automation rules stored in SQLite")]
#[command(long_about = "Manage automation rules stored in SQLite

Examples:
  rulectl init                          # Create the database and tables
  rulectl insert rule.json              # Insert a rule (or an array of rules)
  rulectl get 1001                      # Show one rule as JSON
  rulectl list --enabled                # List enabled rules
  rulectl export rules_export.csv       # Export all rules to CSV
  rulectl import rules_export.csv       # Import (insert or update) from CSV")]
#[command(version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    command: RuleCommands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Configuration file (YAML, TOML or JSON)
    #[arg(short = 'c', long = "config", global = true)]
    config_path: Option<PathBuf>,

    /// Database file (overrides configuration)
    #[arg(long = "db-path", global = true)]
    db_path: Option<PathBuf>,
}

impl Cli {
    /// Resolve the store configuration: file/env layers, then CLI overrides
    fn store_config(&self) -> Result<StoreConfig> {
        let mut config = StoreConfig::load(self.config_path.as_deref())
            .context("Failed to load configuration")?;
        if let Some(db_path) = &self.db_path {
            config.database_path = db_path.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configure colored output
    if cli.no_color {
        colored::control::set_override(false);
    }

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    common::logging::init(log_level).context("Failed to initialize logging")?;

    run(cli).await
}

/// Open the store, run one command, close the store; errors are returned unlogged
async fn run(cli: Cli) -> Result<()> {
    let config = cli.store_config()?;
    debug!("Database: {}", config.database_path.display());

    let store = RuleStore::open_with_config(&config)
        .await
        .with_context(|| format!("Cannot open {}", config.database_path.display()))?;

    let result = rules::handle_command(cli.command, &store, &config).await;
    store.close().await;
    debug!("Store closed");
    result
}
