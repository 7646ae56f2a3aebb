use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::{BackupInfo, TableStore};
use crate::error::{BudError, Result};

type Rows = BTreeMap<String, serde_json::Value>;

#[derive(Default)]
struct Inner {
    tables: BTreeMap<String, Rows>,
    backups: Vec<(BackupInfo, Rows)>,
}

/// In-process table store. Used by tests and by `bud run` without a data dir.
#[derive(Default)]
pub struct MemoryTableStore {
    inner: Mutex<Inner>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| BudError::Store("memory store lock poisoned".into()))
    }
}

impl TableStore for MemoryTableStore {
    fn get(&self, table: &str, key: &str) -> Result<Option<serde_json::Value>> {
        let inner = self.lock()?;
        Ok(inner.tables.get(table).and_then(|t| t.get(key)).cloned())
    }

    fn put(&self, table: &str, key: &str, value: &serde_json::Value) -> Result<()> {
        let mut inner = self.lock()?;
        inner
            .tables
            .entry(table.to_string())
            .or_default()
            .insert(key.to_string(), value.clone());
        Ok(())
    }

    fn delete(&self, table: &str, key: &str) -> Result<bool> {
        let mut inner = self.lock()?;
        Ok(inner
            .tables
            .get_mut(table)
            .map(|t| t.remove(key).is_some())
            .unwrap_or(false))
    }

    fn scan(&self, table: &str) -> Result<Vec<(String, serde_json::Value)>> {
        let inner = self.lock()?;
        Ok(inner
            .tables
            .get(table)
            .map(|t| t.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    fn tables(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.tables.keys().cloned().collect())
    }

    fn create_backup(&self, table: &str, name: &str, at: DateTime<Utc>) -> Result<BackupInfo> {
        let mut inner = self.lock()?;
        let rows = inner
            .tables
            .get(table)
            .cloned()
            .ok_or_else(|| BudError::TableNotFound(table.to_string()))?;
        let info = BackupInfo {
            name: name.to_string(),
            table: table.to_string(),
            items: rows.len(),
            created_at: at,
        };
        inner
            .backups
            .retain(|(b, _)| !(b.table == table && b.name == name));
        inner.backups.push((info.clone(), rows));
        Ok(info)
    }

    fn list_backups(&self, table: &str) -> Result<Vec<BackupInfo>> {
        let inner = self.lock()?;
        let mut list: Vec<BackupInfo> = inner
            .backups
            .iter()
            .filter(|(info, _)| info.table == table)
            .map(|(info, _)| info.clone())
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    fn backup_rows(&self, table: &str, name: &str) -> Result<Option<Vec<(String, serde_json::Value)>>> {
        let inner = self.lock()?;
        Ok(inner
            .backups
            .iter()
            .find(|(b, _)| b.table == table && b.name == name)
            .map(|(_, rows)| rows.iter().map(|(k, v)| (k.clone(), v.clone())).collect()))
    }
}
