//! Key-value table collaborator.
//!
//! All bot state (service metadata, user roles, deploy and build history)
//! lives in named tables of JSON documents. [`TableStore`] is the seam; the
//! bot ships a redb-backed store for real use and an in-memory one for tests.

pub mod catalog;
pub mod memory;
pub mod redb_store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use catalog::{Catalog, DeployRecord, DeployStatus, ServiceRecord};
pub use memory::MemoryTableStore;
pub use redb_store::RedbTableStore;

/// Metadata of an on-demand table backup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupInfo {
    pub name: String,
    pub table: String,
    pub items: usize,
    pub created_at: DateTime<Utc>,
}

pub trait TableStore: Send + Sync {
    fn get(&self, table: &str, key: &str) -> Result<Option<serde_json::Value>>;

    fn put(&self, table: &str, key: &str, value: &serde_json::Value) -> Result<()>;

    /// Returns whether a row was removed.
    fn delete(&self, table: &str, key: &str) -> Result<bool>;

    /// All rows of `table` in key order. A missing table scans as empty.
    fn scan(&self, table: &str) -> Result<Vec<(String, serde_json::Value)>>;

    /// Names of the user-visible tables.
    fn tables(&self) -> Result<Vec<String>>;

    /// Copy every row of `table` into a backup called `name`.
    ///
    /// Backup names are scoped to their table. Reusing a name replaces that
    /// backup's rows and metadata.
    fn create_backup(&self, table: &str, name: &str, at: DateTime<Utc>) -> Result<BackupInfo>;

    /// Backups of `table`, newest first.
    fn list_backups(&self, table: &str) -> Result<Vec<BackupInfo>>;

    /// Rows captured by backup `name` of `table`, in key order.
    fn backup_rows(&self, table: &str, name: &str) -> Result<Option<Vec<(String, serde_json::Value)>>>;
}

/// Physical name of an application table inside an environment.
pub fn env_table(env: &str, table: &str) -> String {
    format!("{env}:{table}")
}

/// Deserialize a row, mapping shape errors to a store error that names the row.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(
    table: &str,
    key: &str,
    value: serde_json::Value,
) -> Result<T> {
    serde_json::from_value(value).map_err(|e| {
        crate::error::BudError::Store(format!("malformed row {table}/{key}: {e}"))
    })
}
