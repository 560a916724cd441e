//! Canonical table definitions
//!
//! Every statement is idempotent, so opening an existing database leaves its
//! data untouched.

use sqlx::SqlitePool;
use tracing::{debug, error};

use crate::error::{Result, StoreError};

pub const RULES_TABLE: &str = "rules";
pub const GROUP_DATA_TABLE: &str = "rule_group_data";

const CREATE_RULES_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS rules (
        id TEXT PRIMARY KEY NOT NULL,
        enable TEXT,
        name TEXT,
        mode TEXT,
        trigger_method TEXT,
        operator TEXT,
        trigger_condition TEXT,
        trigger_value TEXT,
        func_name TEXT,
        output_network TEXT,
        output_register_address TEXT,
        output_data_unit TEXT,
        output_data_bit TEXT,
        network TEXT,
        register_address TEXT,
        data_unit TEXT,
        data_bit TEXT
    )
"#;

const CREATE_GROUP_DATA_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS rule_group_data (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        rule_id TEXT NOT NULL,
        item_index TEXT,
        logical_condition TEXT,
        network TEXT,
        register_address TEXT,
        data_unit TEXT,
        data_bit TEXT,
        position INTEGER NOT NULL,
        FOREIGN KEY (rule_id) REFERENCES rules(id) ON DELETE CASCADE
    )
"#;

const CREATE_GROUP_DATA_INDEX: &str = r#"
    CREATE INDEX IF NOT EXISTS idx_rule_group_data_rule
    ON rule_group_data (rule_id, position)
"#;

/// Create both tables and the child lookup index
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    for (name, sql) in [
        (RULES_TABLE, CREATE_RULES_TABLE),
        (GROUP_DATA_TABLE, CREATE_GROUP_DATA_TABLE),
        ("idx_rule_group_data_rule", CREATE_GROUP_DATA_INDEX),
    ] {
        sqlx::query(sql).execute(pool).await.map_err(|e| {
            error!("Create {} failed: {}", name, e);
            StoreError::Schema(format!("{}: {}", name, e))
        })?;
        debug!("Schema ready: {}", name);
    }
    Ok(())
}

/// Check that both tables exist
pub async fn tables_exist(pool: &SqlitePool) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN (?, ?)",
    )
    .bind(RULES_TABLE)
    .bind(GROUP_DATA_TABLE)
    .fetch_one(pool)
    .await?;
    Ok(count == 2)
}
