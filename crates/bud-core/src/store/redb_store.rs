//! redb-backed table store.
//!
//! # Table design
//!
//! Each logical table is a redb table `&str → &[u8]` holding JSON documents.
//! Backups are full copies stored in `__backup:<table>/<name>` tables and
//! registered in the `__backups` table under the key `<table>/<name>`. Tables whose name
//! starts with `__` are internal and hidden from [`TableStore::tables`].

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable, TableDefinition, TableError, TableHandle};

use super::{BackupInfo, TableStore};
use crate::error::{BudError, Result};

const BACKUPS: TableDefinition<&str, &[u8]> = TableDefinition::new("__backups");

fn def(name: &str) -> TableDefinition<'_, &'static str, &'static [u8]> {
    TableDefinition::new(name)
}

fn store_err(e: impl std::fmt::Display) -> BudError {
    BudError::Store(e.to_string())
}

fn backup_key(table: &str, name: &str) -> String {
    format!("{table}/{name}")
}

fn backup_table(table: &str, name: &str) -> String {
    format!("__backup:{}", backup_key(table, name))
}

/// Persistent [`TableStore`] in a single redb file.
pub struct RedbTableStore {
    db: Database,
}

impl RedbTableStore {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(store_err)?;
        let wt = db.begin_write().map_err(store_err)?;
        wt.open_table(BACKUPS).map_err(store_err)?;
        wt.commit().map_err(store_err)?;
        Ok(Self { db })
    }

    fn read_rows(&self, table: &str) -> Result<Option<Vec<(String, serde_json::Value)>>> {
        let rt = self.db.begin_read().map_err(store_err)?;
        let t = match rt.open_table(def(table)) {
            Ok(t) => t,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(store_err(e)),
        };
        let mut rows = Vec::new();
        for entry in t.iter().map_err(store_err)? {
            let (k, v) = entry.map_err(store_err)?;
            let value: serde_json::Value = serde_json::from_slice(v.value())?;
            rows.push((k.value().to_string(), value));
        }
        Ok(Some(rows))
    }
}

impl TableStore for RedbTableStore {
    fn get(&self, table: &str, key: &str) -> Result<Option<serde_json::Value>> {
        let rt = self.db.begin_read().map_err(store_err)?;
        let t = match rt.open_table(def(table)) {
            Ok(t) => t,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(store_err(e)),
        };
        match t.get(key).map_err(store_err)? {
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
            None => Ok(None),
        }
    }

    fn put(&self, table: &str, key: &str, value: &serde_json::Value) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        let wt = self.db.begin_write().map_err(store_err)?;
        {
            let mut t = wt.open_table(def(table)).map_err(store_err)?;
            t.insert(key, bytes.as_slice()).map_err(store_err)?;
        }
        wt.commit().map_err(store_err)?;
        Ok(())
    }

    fn delete(&self, table: &str, key: &str) -> Result<bool> {
        let wt = self.db.begin_write().map_err(store_err)?;
        let removed = {
            let mut t = wt.open_table(def(table)).map_err(store_err)?;
            let old = t.remove(key).map_err(store_err)?;
            old.is_some()
        };
        wt.commit().map_err(store_err)?;
        Ok(removed)
    }

    fn scan(&self, table: &str) -> Result<Vec<(String, serde_json::Value)>> {
        Ok(self.read_rows(table)?.unwrap_or_default())
    }

    fn tables(&self) -> Result<Vec<String>> {
        let rt = self.db.begin_read().map_err(store_err)?;
        let mut names: Vec<String> = rt
            .list_tables()
            .map_err(store_err)?
            .map(|h| h.name().to_string())
            .filter(|n| !n.starts_with("__"))
            .collect();
        names.sort();
        Ok(names)
    }

    fn create_backup(&self, table: &str, name: &str, at: DateTime<Utc>) -> Result<BackupInfo> {
        let rows = self
            .read_rows(table)?
            .ok_or_else(|| BudError::TableNotFound(table.to_string()))?;
        let info = BackupInfo {
            name: name.to_string(),
            table: table.to_string(),
            items: rows.len(),
            created_at: at,
        };
        let meta = serde_json::to_vec(&info)?;
        let copy_name = backup_table(table, name);

        let wt = self.db.begin_write().map_err(store_err)?;
        wt.delete_table(def(&copy_name)).map_err(store_err)?;
        {
            let mut copy = wt.open_table(def(&copy_name)).map_err(store_err)?;
            for (k, v) in &rows {
                let bytes = serde_json::to_vec(v)?;
                copy.insert(k.as_str(), bytes.as_slice()).map_err(store_err)?;
            }
            let mut registry = wt.open_table(BACKUPS).map_err(store_err)?;
            let key = backup_key(table, name);
            registry
                .insert(key.as_str(), meta.as_slice())
                .map_err(store_err)?;
        }
        wt.commit().map_err(store_err)?;
        Ok(info)
    }

    fn list_backups(&self, table: &str) -> Result<Vec<BackupInfo>> {
        let prefix = format!("{table}/");
        let rt = self.db.begin_read().map_err(store_err)?;
        let registry = rt.open_table(BACKUPS).map_err(store_err)?;
        let mut list = Vec::new();
        for entry in registry.iter().map_err(store_err)? {
            let (k, v) = entry.map_err(store_err)?;
            if k.value().starts_with(&prefix) {
                list.push(serde_json::from_slice::<BackupInfo>(v.value())?);
            }
        }
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    fn backup_rows(&self, table: &str, name: &str) -> Result<Option<Vec<(String, serde_json::Value)>>> {
        self.read_rows(&backup_table(table, name))
    }
}
