/*!
Filesystem blob store.
*/

use std::fs;
use std::path::{Path, PathBuf};

use super::BlobStore;
use crate::{BackupError, Result};

/// Blob store backed by a directory tree. Keys are interpreted as paths
/// relative to the root; parent directories are created on demand.
///
/// This is the durable variant's adapter for deployments without an object
/// store, and the backing store of the CLI archive directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn resolve(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn ensure_parent_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    BackupError::storage(format!(
                        "failed to create directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }
        Ok(())
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.resolve(key);
        self.ensure_parent_dir(&path)?;
        fs::write(&path, data).map_err(|e| {
            BackupError::storage(format!("failed to write blob {}: {e}", path.display()))
        })
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(key);
        fs::read(&path).map_err(|e| {
            BackupError::storage(format!("failed to read blob {}: {e}", path.display()))
        })
    }

    fn exists(&self, key: &str) -> bool {
        self.resolve(key).exists()
    }

    fn delete(&self, key: &str) -> Result<()> {
        let path = self.resolve(key);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| {
                BackupError::storage(format!("failed to delete blob {}: {e}", path.display()))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fs_blob_store_basic_operations() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path());

        store.put("snapshot.json.gz", b"bytes").unwrap();
        assert!(store.exists("snapshot.json.gz"));
        assert_eq!(store.get("snapshot.json.gz").unwrap(), b"bytes");

        store.delete("snapshot.json.gz").unwrap();
        assert!(!store.exists("snapshot.json.gz"));
    }

    #[test]
    fn test_fs_blob_store_creates_nested_directories() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path());

        let key = "teacher-1/20260301-abc.json.gz";
        store.put(key, b"bytes").unwrap();
        assert!(store.exists(key));
        assert_eq!(store.get(key).unwrap(), b"bytes");
    }

    #[test]
    fn test_fs_blob_store_get_missing() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path());
        assert!(store.get("missing.json.gz").is_err());
    }
}
