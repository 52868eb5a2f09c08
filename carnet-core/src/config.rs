/*!
Backend selection and engine wiring.

The engine is adapter-agnostic; this module is where a deployment picks its
adapter pair. The record store is always injected by the host application,
which owns the relational (or in-memory) client.
*/

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::archive::ArchiveIndex;
use crate::catalog::{FsCatalog, MemoryCatalog};
use crate::engine::{BackupEngine, BackupOps};
use crate::records::RecordStore;
use crate::storage::{FsBlobStore, MemoryBlobStore};
use crate::{BackupError, Result};

/// Supported blob/catalog backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveBackend {
    /// Ephemeral in-process storage: the local variant
    Memory,
    /// Directory tree on the local filesystem
    Fs,
    /// Amazon S3 blobs with a filesystem catalog
    #[cfg(feature = "s3")]
    S3,
}

/// Configuration for building a backup engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    pub backend: ArchiveBackend,
    /// Root directory for blobs and catalog rows (Fs backend) or catalog
    /// rows alone (S3 backend)
    pub root: Option<PathBuf>,
    /// S3 bucket name (S3 backend)
    #[cfg(feature = "s3")]
    pub s3_bucket: Option<String>,
}

impl BackupConfig {
    pub fn memory() -> Self {
        Self {
            backend: ArchiveBackend::Memory,
            root: None,
            #[cfg(feature = "s3")]
            s3_bucket: None,
        }
    }

    pub fn fs<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            backend: ArchiveBackend::Fs,
            root: Some(root.into()),
            #[cfg(feature = "s3")]
            s3_bucket: None,
        }
    }

    #[cfg(feature = "s3")]
    pub fn s3<P: Into<PathBuf>>(bucket: String, catalog_root: P) -> Self {
        Self {
            backend: ArchiveBackend::S3,
            root: Some(catalog_root.into()),
            s3_bucket: Some(bucket),
        }
    }

    /// Validate that the selected backend has what it needs.
    pub fn validate(&self) -> Result<()> {
        match self.backend {
            ArchiveBackend::Memory => {}
            ArchiveBackend::Fs => {
                if self.root.is_none() {
                    return Err(BackupError::storage("Fs backend requires a root directory"));
                }
            }
            #[cfg(feature = "s3")]
            ArchiveBackend::S3 => {
                if self.s3_bucket.as_deref().map_or(true, str::is_empty) {
                    return Err(BackupError::storage("S3 backend requires a bucket name"));
                }
                if self.root.is_none() {
                    return Err(BackupError::storage(
                        "S3 backend requires a root directory for the catalog",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Build an engine for the configured backend over the given record store.
pub fn create_engine_from_config<R>(config: &BackupConfig, records: R) -> Result<Box<dyn BackupOps>>
where
    R: RecordStore + 'static,
{
    config.validate()?;

    match config.backend {
        ArchiveBackend::Memory => {
            let index = ArchiveIndex::with_gzip(MemoryBlobStore::new(), MemoryCatalog::new());
            Ok(Box::new(BackupEngine::new(index, records)))
        }
        ArchiveBackend::Fs => {
            let root = config.root.as_ref().unwrap();
            let index = ArchiveIndex::with_gzip(
                FsBlobStore::new(root.join("blobs")),
                FsCatalog::new(root.join("index")),
            );
            Ok(Box::new(BackupEngine::new(index, records)))
        }
        #[cfg(feature = "s3")]
        ArchiveBackend::S3 => {
            let root = config.root.as_ref().unwrap();
            let bucket = config.s3_bucket.clone().unwrap();
            let index = ArchiveIndex::with_gzip(
                crate::storage::s3_blob_store(bucket)?,
                FsCatalog::new(root.join("index")),
            );
            Ok(Box::new(BackupEngine::new(index, records)))
        }
    }
}
