//! Rules Repository - SQLite persistence for rules and their condition groups
//!
//! Writes that touch both tables run inside one transaction, so a failure
//! anywhere leaves the previous state intact.
//!
//! A `RuleStore` owns its connection pool. It is not meant to be shared
//! between tasks without external serialization (e.g. `Arc<Mutex<RuleStore>>`).

use std::path::Path;
use std::sync::OnceLock;

use common::sqlite::{SqliteClient, SqlitePool, SqliteSettings};
use sqlx::{FromRow, Sqlite, Transaction};
use tracing::{debug, error, info, warn};

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::schema::init_schema;
use crate::types::{GroupData, Rule, RuleFilter, UpsertOutcome};

// ============================================================================
// Row mapping
// ============================================================================

/// `rules` row; NULL text reads back as empty
#[derive(Debug, FromRow)]
struct RuleRow {
    id: String,
    enable: Option<String>,
    name: Option<String>,
    mode: Option<String>,
    trigger_method: Option<String>,
    operator: Option<String>,
    trigger_condition: Option<String>,
    trigger_value: Option<String>,
    func_name: Option<String>,
    output_network: Option<String>,
    output_register_address: Option<String>,
    output_data_unit: Option<String>,
    output_data_bit: Option<String>,
    network: Option<String>,
    register_address: Option<String>,
    data_unit: Option<String>,
    data_bit: Option<String>,
}

impl RuleRow {
    fn into_rule(self, group_data: Vec<GroupData>) -> Rule {
        Rule {
            id: self.id,
            enable: self.enable.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            mode: self.mode.unwrap_or_default(),
            trigger_method: self.trigger_method.unwrap_or_default(),
            operator: self.operator.unwrap_or_default(),
            trigger_condition: self.trigger_condition.unwrap_or_default(),
            trigger_value: self.trigger_value.unwrap_or_default(),
            func_name: self.func_name.unwrap_or_default(),
            output_network: self.output_network.unwrap_or_default(),
            output_register_address: self.output_register_address.unwrap_or_default(),
            output_data_unit: self.output_data_unit.unwrap_or_default(),
            output_data_bit: self.output_data_bit.unwrap_or_default(),
            network: self.network.unwrap_or_default(),
            register_address: self.register_address.unwrap_or_default(),
            data_unit: self.data_unit.unwrap_or_default(),
            data_bit: self.data_bit.unwrap_or_default(),
            group_data,
        }
    }
}

/// `rule_group_data` row
#[derive(Debug, FromRow)]
struct GroupDataRow {
    item_index: Option<String>,
    logical_condition: Option<String>,
    network: Option<String>,
    register_address: Option<String>,
    data_unit: Option<String>,
    data_bit: Option<String>,
}

impl From<GroupDataRow> for GroupData {
    fn from(row: GroupDataRow) -> Self {
        GroupData {
            index: row.item_index.unwrap_or_default(),
            logical_condition: row.logical_condition.unwrap_or_default(),
            network: row.network.unwrap_or_default(),
            register_address: row.register_address.unwrap_or_default(),
            data_unit: row.data_unit.unwrap_or_default(),
            data_bit: row.data_bit.unwrap_or_default(),
        }
    }
}

// ============================================================================
// SQL built from the column mapping
// ============================================================================

fn rule_column_names() -> Vec<&'static str> {
    Rule::default()
        .scalar_columns()
        .iter()
        .map(|(column, _)| *column)
        .collect()
}

fn insert_rule_sql() -> &'static str {
    static SQL: OnceLock<String> = OnceLock::new();
    SQL.get_or_init(|| {
        let columns = rule_column_names();
        format!(
            "INSERT INTO rules (id, {}) VALUES (?{})",
            columns.join(", "),
            ", ?".repeat(columns.len())
        )
    })
}

fn update_rule_sql() -> &'static str {
    static SQL: OnceLock<String> = OnceLock::new();
    SQL.get_or_init(|| {
        let assignments: Vec<String> = rule_column_names()
            .iter()
            .map(|column| format!("{} = ?", column))
            .collect();
        format!("UPDATE rules SET {} WHERE id = ?", assignments.join(", "))
    })
}

fn insert_group_data_sql() -> &'static str {
    static SQL: OnceLock<String> = OnceLock::new();
    SQL.get_or_init(|| {
        let columns: Vec<&str> = GroupData::default()
            .columns()
            .iter()
            .map(|(column, _)| *column)
            .collect();
        format!(
            "INSERT INTO rule_group_data (rule_id, {}, position) VALUES (?{}, ?)",
            columns.join(", "),
            ", ?".repeat(columns.len())
        )
    })
}

// ============================================================================
// RuleStore
// ============================================================================

/// SQLite-backed store for rules and their ordered condition groups
pub struct RuleStore {
    client: SqliteClient,
}

impl RuleStore {
    /// Open (creating if absent) the database at `path` and ensure the schema
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(&StoreConfig::with_path(path.as_ref())).await
    }

    /// Open using pool settings from a [`StoreConfig`]
    pub async fn open_with_config(config: &StoreConfig) -> Result<Self> {
        config.validate()?;

        let settings = SqliteSettings {
            max_connections: config.max_connections,
            busy_timeout: config.busy_timeout(),
        };
        let client = SqliteClient::new(&config.database_path, &settings)
            .await
            .map_err(|e| {
                error!("Cannot open database: {:#}", e);
                StoreError::StorageUnavailable(format!("{:#}", e))
            })?;

        Self::with_client(client).await
    }

    /// Private in-memory database, mainly for tests
    pub async fn open_in_memory() -> Result<Self> {
        let client = SqliteClient::in_memory().await.map_err(|e| {
            error!("Cannot open in-memory database: {:#}", e);
            StoreError::StorageUnavailable(format!("{:#}", e))
        })?;

        Self::with_client(client).await
    }

    async fn with_client(client: SqliteClient) -> Result<Self> {
        if let Err(e) = init_schema(client.pool()).await {
            client.close().await;
            return Err(e);
        }
        info!("Rule store ready: {}", client.path());
        Ok(Self { client })
    }

    /// Underlying pool, for diagnostics and ad hoc queries
    pub fn pool(&self) -> &SqlitePool {
        self.client.pool()
    }

    /// Database path (`:memory:` for in-memory stores)
    pub fn path(&self) -> &str {
        self.client.path()
    }

    /// Release the database handle
    pub async fn close(self) {
        self.client.close().await;
    }

    /// Insert a rule and its condition groups; returns the rule id
    pub async fn insert(&self, rule: &Rule) -> Result<String> {
        if rule.id.trim().is_empty() {
            return Err(StoreError::InvalidRule("rule id must not be empty".into()));
        }

        let mut tx = self.pool().begin().await?;

        let mut query = sqlx::query(insert_rule_sql()).bind(rule.id.as_str());
        for (_, value) in rule.scalar_columns() {
            query = query.bind(value);
        }
        query.execute(&mut *tx).await.map_err(|e| {
            let err = StoreError::from(e);
            warn!("Insert rule {} failed: {}", rule.id, err);
            err
        })?;

        insert_group_data(&mut tx, &rule.id, &rule.group_data).await?;

        tx.commit().await?;
        debug!(
            "Rule inserted: {} ({} groups)",
            rule.id,
            rule.group_data_size()
        );
        Ok(rule.id.clone())
    }

    /// Replace the scalar fields and the full condition group list of rule `id`
    pub async fn update(&self, id: &str, rule: &Rule) -> Result<()> {
        let mut tx = self.pool().begin().await?;

        let mut query = sqlx::query(update_rule_sql());
        for (_, value) in rule.scalar_columns() {
            query = query.bind(value);
        }
        let result = query.bind(id).execute(&mut *tx).await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }

        sqlx::query("DELETE FROM rule_group_data WHERE rule_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        insert_group_data(&mut tx, id, &rule.group_data).await?;

        tx.commit().await?;
        debug!("Rule updated: {} ({} groups)", id, rule.group_data_size());
        Ok(())
    }

    /// Get a rule with its condition groups in stored order
    pub async fn get(&self, id: &str) -> Result<Rule> {
        let row: Option<RuleRow> = sqlx::query_as("SELECT * FROM rules WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        let Some(row) = row else {
            return Err(StoreError::NotFound(id.to_string()));
        };

        let groups: Vec<GroupDataRow> = sqlx::query_as(
            r#"
            SELECT item_index, logical_condition, network, register_address, data_unit, data_bit
            FROM rule_group_data
            WHERE rule_id = ?
            ORDER BY position ASC, id ASC
            "#,
        )
        .bind(id)
        .fetch_all(self.pool())
        .await?;

        Ok(row.into_rule(groups.into_iter().map(GroupData::from).collect()))
    }

    /// Delete a rule and its condition groups; absent ids are not an error
    pub async fn delete(&self, id: &str) -> Result<()> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM rule_group_data WHERE rule_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM rules WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        if result.rows_affected() == 0 {
            debug!("Delete: rule {} not present", id);
        } else {
            debug!("Rule deleted: {}", id);
        }
        Ok(())
    }

    /// All rules ordered by id
    pub async fn list_all(&self) -> Result<Vec<Rule>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM rules ORDER BY id ASC")
            .fetch_all(self.pool())
            .await?;
        self.get_many(ids).await
    }

    /// Rules whose `enable` text matches one of `enable_values`
    pub async fn list_enabled<S: AsRef<str>>(&self, enable_values: &[S]) -> Result<Vec<Rule>> {
        let rules = self.list_all().await?;
        Ok(rules
            .into_iter()
            .filter(|rule| rule.is_enabled(enable_values))
            .collect())
    }

    /// Exact-match search on name, mode, network and function name
    pub async fn search(&self, filter: &RuleFilter) -> Result<Vec<Rule>> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT id FROM rules
            WHERE (?1 IS NULL OR name = ?1)
              AND (?2 IS NULL OR mode = ?2)
              AND (?3 IS NULL OR network = ?3)
              AND (?4 IS NULL OR func_name = ?4)
            ORDER BY id ASC
            "#,
        )
        .bind(filter.name.as_deref())
        .bind(filter.mode.as_deref())
        .bind(filter.network.as_deref())
        .bind(filter.func_name.as_deref())
        .fetch_all(self.pool())
        .await?;
        self.get_many(ids).await
    }

    /// True when a rule with `id` exists
    pub async fn exists(&self, id: &str) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM rules WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(found.is_some())
    }

    /// Number of stored rules
    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rules")
            .fetch_one(self.pool())
            .await?;
        Ok(count as u64)
    }

    /// Update the rule if present, insert it otherwise
    pub async fn upsert(&self, rule: &Rule) -> Result<UpsertOutcome> {
        if self.exists(&rule.id).await? {
            self.update(&rule.id, rule).await?;
            Ok(UpsertOutcome::Updated)
        } else {
            self.insert(rule).await?;
            Ok(UpsertOutcome::Inserted)
        }
    }

    async fn get_many(&self, ids: Vec<String>) -> Result<Vec<Rule>> {
        let mut rules = Vec::with_capacity(ids.len());
        for id in ids {
            rules.push(self.get(&id).await?);
        }
        Ok(rules)
    }
}

/// Write condition groups for `rule_id` with position = sequence index
async fn insert_group_data(
    tx: &mut Transaction<'_, Sqlite>,
    rule_id: &str,
    group_data: &[GroupData],
) -> Result<()> {
    for (position, group) in group_data.iter().enumerate() {
        let mut query = sqlx::query(insert_group_data_sql()).bind(rule_id);
        for (_, value) in group.columns() {
            query = query.bind(value);
        }
        query
            .bind(position as i64)
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                let err = StoreError::from(e);
                warn!(
                    "Insert group data {}[{}] failed: {}",
                    rule_id, position, err
                );
                err
            })?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_generated_sql_placeholders_match_columns() {
        let insert = insert_rule_sql();
        assert!(insert.starts_with("INSERT INTO rules (id, enable, name"));
        assert_eq!(insert.matches('?').count(), 17);

        let update = update_rule_sql();
        assert!(update.contains("trigger_method = ?"));
        assert!(update.ends_with("WHERE id = ?"));
        assert_eq!(update.matches('?').count(), 17);

        let group = insert_group_data_sql();
        assert!(group.contains("(rule_id, item_index, logical_condition"));
        assert_eq!(group.matches('?').count(), 8);
    }

    #[tokio::test]
    async fn test_open_in_memory_creates_tables() {
        let store = RuleStore::open_in_memory().await.unwrap();
        assert!(crate::schema::tables_exist(store.pool()).await.unwrap());
        assert_eq!(store.path(), ":memory:");
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
