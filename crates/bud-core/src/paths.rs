use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const BUD_DIR: &str = ".bud";
pub const CONFIG_FILE: &str = ".bud/config.yaml";
pub const TABLES_DB: &str = ".bud/tables.redb";
pub const QUEUE_DB: &str = ".bud/queue.redb";
pub const OBJECTS_DIR: &str = ".bud/objects";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn bud_dir(root: &Path) -> PathBuf {
    root.join(BUD_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn tables_db(root: &Path) -> PathBuf {
    root.join(TABLES_DB)
}

pub fn queue_db(root: &Path) -> PathBuf {
    root.join(QUEUE_DB)
}

pub fn objects_dir(root: &Path) -> PathBuf {
    root.join(OBJECTS_DIR)
}

/// Object key of a build artifact.
pub fn artifact_key(service: &str, version: &str) -> String {
    format!("artifacts/{service}/{version}.zip")
}
