/*!
Catalog store ports and adapters.

The catalog holds archive entries (snapshot metadata) independent of snapshot
content. The durable variant keeps it in a relational table behind this port;
[`MemoryCatalog`] is the local variant's bounded catalog and [`FsCatalog`]
keeps one JSON row file per entry for CLI-managed archive directories.
*/

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::archive::ArchiveEntry;
use crate::model::TenantId;
use crate::{BackupError, Result};

/// Structured store for archive entries.
///
/// Entries are immutable: there is no update operation, only insert and
/// delete.
pub trait CatalogStore: Send + Sync {
    fn insert(&self, entry: &ArchiveEntry) -> Result<()>;

    fn get(&self, entry_id: &str) -> Result<Option<ArchiveEntry>>;

    /// All entries for one tenant, newest first
    fn list(&self, tenant: &TenantId) -> Result<Vec<ArchiveEntry>>;

    /// Returns whether an entry was actually removed
    fn delete(&self, entry_id: &str) -> Result<bool>;
}

fn newest_first(entries: &mut [ArchiveEntry]) {
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// In-memory catalog keyed by entry id.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    entries: Arc<Mutex<HashMap<String, ArchiveEntry>>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CatalogStore for MemoryCatalog {
    fn insert(&self, entry: &ArchiveEntry) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(entry.id.clone(), entry.clone());
        Ok(())
    }

    fn get(&self, entry_id: &str) -> Result<Option<ArchiveEntry>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.get(entry_id).cloned())
    }

    fn list(&self, tenant: &TenantId) -> Result<Vec<ArchiveEntry>> {
        let entries = self.entries.lock().unwrap();
        let mut rows: Vec<ArchiveEntry> = entries
            .values()
            .filter(|e| &e.tenant_id == tenant)
            .cloned()
            .collect();
        newest_first(&mut rows);
        Ok(rows)
    }

    fn delete(&self, entry_id: &str) -> Result<bool> {
        let mut entries = self.entries.lock().unwrap();
        Ok(entries.remove(entry_id).is_some())
    }
}

/// Catalog kept as one JSON file per entry under a root directory.
#[derive(Debug, Clone)]
pub struct FsCatalog {
    root: PathBuf,
}

impl FsCatalog {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn row_path(&self, entry_id: &str) -> PathBuf {
        self.root.join(format!("{entry_id}.json"))
    }
}

impl CatalogStore for FsCatalog {
    fn insert(&self, entry: &ArchiveEntry) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(|e| {
                BackupError::storage(format!(
                    "failed to create catalog directory {}: {e}",
                    self.root.display()
                ))
            })?;
        }
        let json = serde_json::to_string_pretty(entry)?;
        fs::write(self.row_path(&entry.id), json).map_err(|e| {
            BackupError::storage(format!("failed to write catalog row {}: {e}", entry.id))
        })
    }

    fn get(&self, entry_id: &str) -> Result<Option<ArchiveEntry>> {
        let path = self.row_path(entry_id);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path).map_err(|e| {
            BackupError::storage(format!("failed to read catalog row {}: {e}", path.display()))
        })?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    fn list(&self, tenant: &TenantId) -> Result<Vec<ArchiveEntry>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut rows = Vec::new();
        let dir = fs::read_dir(&self.root).map_err(|e| {
            BackupError::storage(format!(
                "failed to list catalog directory {}: {e}",
                self.root.display()
            ))
        })?;
        for item in dir {
            let path = item
                .map_err(|e| BackupError::storage(format!("failed to read catalog entry: {e}")))?
                .path();
            if path.extension().map(|ext| ext == "json").unwrap_or(false) {
                let json = fs::read_to_string(&path).map_err(|e| {
                    BackupError::storage(format!(
                        "failed to read catalog row {}: {e}",
                        path.display()
                    ))
                })?;
                let entry: ArchiveEntry = serde_json::from_str(&json)?;
                if &entry.tenant_id == tenant {
                    rows.push(entry);
                }
            }
        }
        newest_first(&mut rows);
        Ok(rows)
    }

    fn delete(&self, entry_id: &str) -> Result<bool> {
        let path = self.row_path(entry_id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|e| {
            BackupError::storage(format!(
                "failed to delete catalog row {}: {e}",
                path.display()
            ))
        })?;
        Ok(true)
    }
}
