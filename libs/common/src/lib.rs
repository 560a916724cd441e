//! Shared infrastructure for the rule store workspace
//!
//! Provides functions shared by the store library and its tools:
//! - logging bootstrap (console + optional rolling file)
//! - SQLite connection setup with foreign keys enforced

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub mod logging;

// Re-export common dependencies
pub use tokio;
pub use tracing;
