//! Object storage and container registry collaborators.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{HelperError, Result};
use crate::store::{decode, TableStore};

// ---------------------------------------------------------------------------
// ObjectStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
}

pub trait ObjectStore: Send + Sync {
    fn put(&self, key: &str, data: &[u8]) -> Result<()>;

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Objects whose key starts with `prefix`, in key order.
    fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>>;
}

/// Objects stored as files below a root directory; keys use `/` separators.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .split('/')
                .all(|part| !part.is_empty() && part != "." && part != "..");
        if !valid {
            return Err(HelperError::Invalid(format!("invalid object key '{key}'")).into());
        }
        Ok(self.root.join(key))
    }

    fn walk(&self, dir: &Path, out: &mut Vec<ObjectInfo>) -> Result<()> {
        let entries = match std::fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let meta = entry.metadata()?;
            if meta.is_dir() {
                self.walk(&path, out)?;
            } else if let Ok(rel) = path.strip_prefix(&self.root) {
                let key = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                out.push(ObjectInfo {
                    key,
                    size: meta.len(),
                });
            }
        }
        Ok(())
    }
}

impl ObjectStore for FsObjectStore {
    fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        crate::io::atomic_write(&self.path_for(key)?, data)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match std::fs::read(self.path_for(key)?) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>> {
        let mut all = Vec::new();
        self.walk(&self.root, &mut all)?;
        all.retain(|o| o.key.starts_with(prefix));
        all.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(all)
    }
}

// ---------------------------------------------------------------------------
// ImageRegistry
// ---------------------------------------------------------------------------

pub const IMAGES: &str = "images";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageTag {
    pub tag: String,
    pub pushed_at: DateTime<Utc>,
}

pub trait ImageRegistry: Send + Sync {
    /// Tags of `repository`, newest first.
    fn tags(&self, repository: &str) -> Result<Vec<ImageTag>>;

    fn push(&self, repository: &str, tag: ImageTag) -> Result<()>;
}

/// Registry metadata kept in the table store: one row per repository.
pub struct TableRegistry {
    store: Arc<dyn TableStore>,
}

impl TableRegistry {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }
}

impl ImageRegistry for TableRegistry {
    fn tags(&self, repository: &str) -> Result<Vec<ImageTag>> {
        let mut tags: Vec<ImageTag> = match self.store.get(IMAGES, repository)? {
            Some(v) => decode(IMAGES, repository, v)?,
            None => Vec::new(),
        };
        tags.sort_by(|a, b| b.pushed_at.cmp(&a.pushed_at));
        Ok(tags)
    }

    fn push(&self, repository: &str, tag: ImageTag) -> Result<()> {
        let mut tags = self.tags(repository)?;
        tags.retain(|t| t.tag != tag.tag);
        tags.push(tag);
        self.store
            .put(IMAGES, repository, &serde_json::to_value(&tags)?)
    }
}

/// Whether `tag` exists in `repository`.
pub fn has_tag(registry: &dyn ImageRegistry, repository: &str, tag: &str) -> Result<bool> {
    Ok(registry.tags(repository)?.iter().any(|t| t.tag == tag))
}
