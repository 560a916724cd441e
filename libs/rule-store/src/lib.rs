//! Rule Store - SQLite persistence for automation rules
//!
//! Each rule carries sixteen text attributes (trigger, operator, input and
//! output register addressing) and an ordered list of condition groups.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌─────────────────┐
//! │  RuleStore  │────▶│    rules     │◀────│ rule_group_data │
//! │   (sqlx)    │     │ (id TEXT PK) │     │ (position, FK)  │
//! └─────────────┘     └──────────────┘     └─────────────────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │  transfer   │  CSV / JSON interchange
//! └─────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use rule_store::{GroupData, Rule, RuleStore};
//!
//! # async fn demo() -> rule_store::Result<()> {
//! let store = RuleStore::open("data/rules.db").await?;
//! let mut rule = Rule::new("1001");
//! rule.name = "temperature-alarm".to_string();
//! rule.group_data.push(GroupData {
//!     index: "1".to_string(),
//!     logical_condition: "AND".to_string(),
//!     ..Default::default()
//! });
//! store.insert(&rule).await?;
//! assert_eq!(store.get("1001").await?.group_data_size(), 1);
//! store.close().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
mod error;
mod repository;
pub mod schema;
pub mod transfer;
pub mod types;

// Re-export public API
pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use repository::RuleStore;
pub use transfer::{export_csv, import_csv, rule_from_json, to_json_pretty};
pub use types::{GroupData, ImportSummary, Rule, RuleFilter, UpsertOutcome};
