pub mod client;

pub use client::{SqliteClient, SqliteSettings, SqlitePool};
