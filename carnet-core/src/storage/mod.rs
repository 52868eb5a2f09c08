/*!
Blob store ports and adapters.

A blob store is an addressable byte store: put/get/delete by string key. The
archive index is written against the sync [`BlobStore`] port; cloud backends
implement the async port and are bridged with [`BlockingBlob`].
*/

pub mod fs;
#[cfg(feature = "s3")]
pub mod s3;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::runtime::Runtime;

use crate::Result;

static GLOBAL_RT: Lazy<Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get().max(4))
        .enable_all()
        .build()
        .expect("Failed to create global async runtime")
});

/// Addressable blob store: the durable variant's object store, or the local
/// variant's key-value store.
pub trait BlobStore: Send + Sync {
    /// Write a blob under the given key, replacing any previous value
    fn put(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Read the blob stored under the given key
    fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Whether a blob exists under the given key
    fn exists(&self, key: &str) -> bool;

    /// Delete the blob under the given key; deleting a missing key is not an
    /// error
    fn delete(&self, key: &str) -> Result<()>;
}

/// Async counterpart of [`BlobStore`] for backends with async clients.
#[async_trait]
pub trait AsyncBlobStore: Send + Sync {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    async fn exists(&self, key: &str) -> Result<bool>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// Bridges an [`AsyncBlobStore`] into the sync [`BlobStore`] port by blocking
/// on a shared runtime.
pub struct BlockingBlob<A: AsyncBlobStore> {
    inner: Arc<A>,
}

impl<A: AsyncBlobStore> BlockingBlob<A> {
    pub fn new(adapter: A) -> Self {
        Self {
            inner: Arc::new(adapter),
        }
    }
}

impl<A: AsyncBlobStore> BlobStore for BlockingBlob<A> {
    fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        GLOBAL_RT.block_on(self.inner.put(key, data.to_vec()))
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        GLOBAL_RT.block_on(self.inner.get(key))
    }

    fn exists(&self, key: &str) -> bool {
        GLOBAL_RT.block_on(self.inner.exists(key)).unwrap_or(false)
    }

    fn delete(&self, key: &str) -> Result<()> {
        GLOBAL_RT.block_on(self.inner.delete(key))
    }
}

/// In-memory blob store. This is the local variant's ephemeral key-value
/// store; it also serves as a test double for the object store.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs currently held
    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let mut blobs = self.blobs.lock().unwrap();
        blobs.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        let blobs = self.blobs.lock().unwrap();
        blobs
            .get(key)
            .cloned()
            .ok_or_else(|| crate::BackupError::storage(format!("blob not found: {key}")))
    }

    fn exists(&self, key: &str) -> bool {
        let blobs = self.blobs.lock().unwrap();
        blobs.contains_key(key)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut blobs = self.blobs.lock().unwrap();
        blobs.remove(key);
        Ok(())
    }
}

pub use fs::FsBlobStore;
#[cfg(feature = "s3")]
pub use s3::S3BlobStore;

/// Build an S3 blob store behind the sync port, blocking on the shared
/// runtime for client initialization.
#[cfg(feature = "s3")]
pub fn s3_blob_store(bucket: String) -> Result<BlockingBlob<S3BlobStore>> {
    let store = GLOBAL_RT.block_on(S3BlobStore::new(bucket))?;
    Ok(BlockingBlob::new(store))
}
