/*!
Backup engine façade.

Wires the snapshot builder, archive index and restore engine into the
operation set the HTTP layer (durable variant) and the UI (local variant)
consume. The engine holds no state of its own beyond its adapters and takes
no locks; the record-store transaction inside restore is the only concurrency
guarantee provided.
*/

use tracing::instrument;

use crate::archive::{ArchiveEntry, ArchiveIndex, ArchiveStats};
use crate::catalog::{CatalogStore, MemoryCatalog};
use crate::compression::{Compressor, GzipCompressor};
use crate::model::TenantId;
use crate::records::{MemoryRecordStore, RecordStore};
use crate::restore::{RestoreEngine, RestoreReport};
use crate::snapshot::SnapshotBuilder;
use crate::storage::{BlobStore, MemoryBlobStore};
use crate::Result;

/// Caller-facing backup operations, object-safe for callers that need
/// dynamic dispatch over the adapter stack.
pub trait BackupOps: Send + Sync {
    /// Capture and archive the tenant's current state
    fn create_backup(&self, tenant: &TenantId) -> Result<ArchiveEntry>;

    /// Archive metadata, newest first; never the documents themselves
    fn list_backups(&self, tenant: &TenantId) -> Result<Vec<ArchiveEntry>>;

    /// Raw document bytes of one archived snapshot
    fn download_backup(&self, entry_id: &str, tenant: &TenantId) -> Result<Vec<u8>>;

    /// Atomically replace the tenant's state with an archived snapshot
    fn restore_backup(&self, entry_id: &str, tenant: &TenantId) -> Result<RestoreReport>;

    /// Delete one archived snapshot; `false` when it does not exist for this
    /// tenant
    fn delete_backup(&self, entry_id: &str, tenant: &TenantId) -> Result<bool>;

    /// Aggregate count/size/recency figures for the tenant's archive
    fn stats(&self, tenant: &TenantId) -> Result<ArchiveStats>;

    /// Capture the tenant's current state as a downloadable document without
    /// archiving it
    fn export_document(&self, tenant: &TenantId) -> Result<String>;

    /// Restore from an uploaded document
    fn import_document(&self, document: &str, tenant: &TenantId) -> Result<RestoreReport>;
}

/// The two variants differ only in the adapters plugged in here.
pub struct BackupEngine<B, C, Z, R>
where
    B: BlobStore,
    C: CatalogStore,
    Z: Compressor,
    R: RecordStore,
{
    index: ArchiveIndex<B, C, Z>,
    records: R,
}

/// The local variant: blobs inlined in process memory, bounded catalog,
/// in-memory structured store.
pub type LocalBackupEngine =
    BackupEngine<MemoryBlobStore, MemoryCatalog, GzipCompressor, MemoryRecordStore>;

/// Build the local variant's engine over an existing record store.
pub fn local_engine(records: MemoryRecordStore) -> LocalBackupEngine {
    BackupEngine::new(
        ArchiveIndex::with_gzip(MemoryBlobStore::new(), MemoryCatalog::new()),
        records,
    )
}

impl<B, C, Z, R> BackupEngine<B, C, Z, R>
where
    B: BlobStore,
    C: CatalogStore,
    Z: Compressor,
    R: RecordStore,
{
    pub fn new(index: ArchiveIndex<B, C, Z>, records: R) -> Self {
        Self { index, records }
    }

    pub fn index(&self) -> &ArchiveIndex<B, C, Z> {
        &self.index
    }

    pub fn records(&self) -> &R {
        &self.records
    }
}

impl<B, C, Z, R> BackupOps for BackupEngine<B, C, Z, R>
where
    B: BlobStore,
    C: CatalogStore,
    Z: Compressor,
    R: RecordStore,
{
    #[instrument(skip(self), fields(tenant = %tenant))]
    fn create_backup(&self, tenant: &TenantId) -> Result<ArchiveEntry> {
        let snapshot = SnapshotBuilder::new(&self.records).build(tenant)?;
        let entry = self.index.store(tenant, &snapshot)?;
        #[cfg(feature = "metrics")]
        crate::observability::record_backup_created(entry.size_bytes);
        Ok(entry)
    }

    fn list_backups(&self, tenant: &TenantId) -> Result<Vec<ArchiveEntry>> {
        self.index.list(tenant)
    }

    fn download_backup(&self, entry_id: &str, tenant: &TenantId) -> Result<Vec<u8>> {
        self.index.fetch_raw(entry_id, tenant)
    }

    #[instrument(skip(self), fields(tenant = %tenant, entry_id = %entry_id))]
    fn restore_backup(&self, entry_id: &str, tenant: &TenantId) -> Result<RestoreReport> {
        let report = RestoreEngine::new(&self.records).restore(&self.index, entry_id, tenant)?;
        #[cfg(feature = "metrics")]
        crate::observability::record_restore();
        Ok(report)
    }

    fn delete_backup(&self, entry_id: &str, tenant: &TenantId) -> Result<bool> {
        let removed = self.index.remove(entry_id, tenant)?;
        #[cfg(feature = "metrics")]
        if removed {
            crate::observability::record_backup_deleted();
        }
        Ok(removed)
    }

    fn stats(&self, tenant: &TenantId) -> Result<ArchiveStats> {
        self.index.stats(tenant)
    }

    fn export_document(&self, tenant: &TenantId) -> Result<String> {
        let snapshot = SnapshotBuilder::new(&self.records).build(tenant)?;
        snapshot.to_json()
    }

    fn import_document(&self, document: &str, tenant: &TenantId) -> Result<RestoreReport> {
        let report = RestoreEngine::new(&self.records).restore_document(document, tenant)?;
        #[cfg(feature = "metrics")]
        crate::observability::record_restore();
        Ok(report)
    }
}
