//! Rule management commands

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use colored::*;
use rule_store::{Rule, RuleFilter, RuleStore, StoreConfig};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Subcommand, Debug)]
pub enum RuleCommands {
    /// Create the database and tables
    #[command(about = "Create the database file and tables if missing")]
    Init,

    /// List all rules
    #[command(about = "List all stored rules as JSON")]
    List {
        /// Show only enabled rules
        #[arg(long)]
        enabled: bool,
    },

    /// Get rule details
    #[command(about = "Show one rule with its condition groups")]
    Get {
        /// Rule ID
        rule_id: String,
    },

    /// Insert rules from a JSON file
    #[command(about = "Insert a rule (JSON object) or several (JSON array)")]
    Insert {
        /// JSON file
        file: PathBuf,
    },

    /// Replace a rule from a JSON file
    #[command(about = "Replace a rule's fields and condition groups")]
    Update {
        /// Rule ID
        rule_id: String,
        /// JSON file with the new rule content
        file: PathBuf,
    },

    /// Delete a rule
    #[command(about = "Delete a rule and its condition groups")]
    Delete {
        /// Rule ID
        rule_id: String,
    },

    /// Export all rules to CSV
    Export {
        /// Output CSV file
        file: PathBuf,
    },

    /// Import rules from CSV
    #[command(about = "Import rules from CSV, updating rules that already exist")]
    Import {
        /// Input CSV file
        file: PathBuf,
    },

    /// Find rules by exact field values
    Search {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        mode: Option<String>,
        #[arg(long)]
        network: Option<String>,
        #[arg(long)]
        func_name: Option<String>,
    },
}

pub async fn handle_command(
    cmd: RuleCommands,
    store: &RuleStore,
    config: &StoreConfig,
) -> Result<()> {
    match cmd {
        RuleCommands::Init => {
            println!(
                "{} {} ({} rules)",
                "Ready:".bright_green(),
                store.path(),
                store.count().await?
            );
        },
        RuleCommands::List { enabled } => {
            let rules = if enabled {
                store.list_enabled(&config.enable_values).await?
            } else {
                store.list_all().await?
            };
            println!("{}", serde_json::to_string_pretty(&rules)?);
        },
        RuleCommands::Get { rule_id } => {
            let rule = store
                .get(&rule_id)
                .await
                .with_context(|| format!("Rule '{}'", rule_id))?;
            println!("{}", rule_store::to_json_pretty(&rule)?);
        },
        RuleCommands::Insert { file } => {
            for rule in read_rules(&file)? {
                let id = store
                    .insert(&rule)
                    .await
                    .with_context(|| format!("Insert rule '{}'", rule.id))?;
                info!("Rule '{}' inserted", id);
                println!("{} {}", "Inserted".bright_green(), id);
            }
        },
        RuleCommands::Update { rule_id, file } => {
            let mut rules = read_rules(&file)?;
            if rules.len() != 1 {
                bail!("{} must contain exactly one rule", file.display());
            }
            let rule = rules.remove(0);
            store
                .update(&rule_id, &rule)
                .await
                .with_context(|| format!("Update rule '{}'", rule_id))?;
            info!("Rule '{}' updated", rule_id);
            println!("{} {}", "Updated".bright_green(), rule_id);
        },
        RuleCommands::Delete { rule_id } => {
            store.delete(&rule_id).await?;
            info!("Rule '{}' deleted", rule_id);
            println!("{} {}", "Deleted".bright_green(), rule_id);
        },
        RuleCommands::Export { file } => {
            let count = store.export_csv_file(&file).await?;
            println!(
                "{} {} rules to {}",
                "Exported".bright_green(),
                count,
                file.display()
            );
        },
        RuleCommands::Import { file } => {
            let summary = store.import_csv_file(&file).await?;
            println!(
                "{} {} inserted, {} updated",
                "Imported:".bright_green(),
                summary.inserted,
                summary.updated
            );
        },
        RuleCommands::Search {
            name,
            mode,
            network,
            func_name,
        } => {
            let filter = RuleFilter {
                name,
                mode,
                network,
                func_name,
            };
            let rules = store.search(&filter).await?;
            println!("{}", serde_json::to_string_pretty(&rules)?);
        },
    }
    Ok(())
}

/// Read one rule (JSON object) or several (JSON array) from a file
pub fn read_rules(path: &Path) -> Result<Vec<Rule>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;

    let rules = match value {
        Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<Rule>, _>>()?,
        Value::Object(_) => vec![serde_json::from_value(value)?],
        _ => bail!("{} must contain a JSON object or array", path.display()),
    };
    Ok(rules)
}
