/*!
Archive index: the catalog of snapshot metadata plus the blob choreography.

Write ordering is load-bearing: blobs are fully written before their catalog
row exists, so a crash between the two leaves at worst an orphan blob
(recoverable by garbage collection), never a row pointing at nothing. On
remove the blob goes first; if that fails the row stays and the error
propagates.
*/

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use crate::catalog::CatalogStore;
use crate::compression::Compressor;
use crate::guard;
use crate::model::TenantId;
use crate::snapshot::Snapshot;
use crate::storage::BlobStore;
use crate::{BackupError, Result};

/// Catalog row describing where a snapshot's bytes live, without containing
/// them. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntry {
    pub id: String,
    pub tenant_id: TenantId,
    pub blob_key: String,
    /// Compressed size of the stored blob
    pub size_bytes: u64,
    pub format_version: String,
    /// SHA-256 hex digest of the uncompressed document
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

/// Aggregate archive figures for one tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveStats {
    pub count: usize,
    pub total_bytes: u64,
    pub newest: Option<DateTime<Utc>>,
}

/// SHA-256 hex digest of a document payload.
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// The snapshot catalog, generic over blob and catalog adapters. Ownership is
/// enforced here on every fetch and remove; a missing entry and another
/// tenant's entry are indistinguishable to the caller.
pub struct ArchiveIndex<B, C, Z = crate::compression::GzipCompressor>
where
    B: BlobStore,
    C: CatalogStore,
    Z: Compressor,
{
    blobs: B,
    catalog: C,
    compressor: Z,
}

impl<B, C> ArchiveIndex<B, C>
where
    B: BlobStore,
    C: CatalogStore,
{
    /// Create an index with the default gzip compressor.
    pub fn with_gzip(blobs: B, catalog: C) -> Self {
        Self::new(blobs, catalog, crate::compression::GzipCompressor::new())
    }
}

impl<B, C, Z> ArchiveIndex<B, C, Z>
where
    B: BlobStore,
    C: CatalogStore,
    Z: Compressor,
{
    pub fn new(blobs: B, catalog: C, compressor: Z) -> Self {
        Self {
            blobs,
            catalog,
            compressor,
        }
    }

    /// Persist a snapshot and file a catalog entry for it.
    ///
    /// The blob key is scoped to the tenant and combines a date component
    /// with a random component, making collisions practically impossible.
    ///
    /// # Errors
    /// * [`BackupError::OwnershipMismatch`] if the snapshot's owner is not
    ///   the tenant it is being filed under
    /// * [`BackupError::Storage`] on blob or catalog failures
    pub fn store(&self, tenant: &TenantId, snapshot: &Snapshot) -> Result<ArchiveEntry> {
        if !guard::owns(tenant, &snapshot.owner.id) {
            return Err(BackupError::OwnershipMismatch);
        }

        let document = snapshot.to_json()?;
        let checksum = compute_checksum(document.as_bytes());
        let compressed = self.compressor.compress(document.as_bytes())?;
        let blob_key = blob_key_for(tenant, snapshot.created_at);

        // Blob first, row second: a crash in between leaves an orphan blob,
        // never a dangling catalog entry.
        self.blobs.put(&blob_key, &compressed)?;

        let entry = ArchiveEntry {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant.clone(),
            blob_key,
            size_bytes: compressed.len() as u64,
            format_version: snapshot.format_version.clone(),
            checksum,
            created_at: snapshot.created_at,
        };
        self.catalog.insert(&entry)?;

        info!(
            tenant = %tenant,
            entry_id = %entry.id,
            key = %entry.blob_key,
            size_bytes = entry.size_bytes,
            algorithm = self.compressor.algorithm_name(),
            "archived snapshot"
        );
        Ok(entry)
    }

    /// All of the tenant's entries, newest first. Metadata only; documents
    /// are never listed.
    pub fn list(&self, tenant: &TenantId) -> Result<Vec<ArchiveEntry>> {
        self.catalog.list(tenant)
    }

    /// Fetch and parse a snapshot.
    pub fn fetch(&self, entry_id: &str, tenant: &TenantId) -> Result<Snapshot> {
        let document = self.fetch_raw(entry_id, tenant)?;
        let json = String::from_utf8(document)
            .map_err(|e| BackupError::invalid_document(format!("document is not UTF-8: {e}")))?;
        Snapshot::from_json(&json)
    }

    /// Fetch the raw uncompressed document bytes (the download path).
    ///
    /// # Errors
    /// [`BackupError::SnapshotNotFound`] if the entry is absent *or* belongs
    /// to another tenant; the two cases are surfaced identically.
    pub fn fetch_raw(&self, entry_id: &str, tenant: &TenantId) -> Result<Vec<u8>> {
        let entry = self.entry(entry_id, tenant)?;
        let compressed = self.blobs.get(&entry.blob_key)?;
        let document = self.compressor.decompress(&compressed)?;

        let actual = compute_checksum(&document);
        if actual != entry.checksum {
            return Err(BackupError::IntegrityCheckFailed {
                expected: entry.checksum,
                actual,
            });
        }
        Ok(document)
    }

    /// Delete a snapshot and its catalog row. Returns `false` when the entry
    /// is absent or owned by another tenant, in which case nothing is
    /// touched.
    pub fn remove(&self, entry_id: &str, tenant: &TenantId) -> Result<bool> {
        let entry = match self.catalog.get(entry_id)? {
            Some(entry) if guard::owns(tenant, &entry.tenant_id) => entry,
            _ => {
                debug!(tenant = %tenant, entry_id = %entry_id, "remove: entry not found for tenant");
                return Ok(false);
            }
        };

        // Blob first; if this fails the row is kept so the entry stays
        // discoverable and the delete can be retried by the caller.
        self.blobs.delete(&entry.blob_key)?;
        let removed = self.catalog.delete(entry_id)?;

        info!(tenant = %tenant, entry_id = %entry_id, key = %entry.blob_key, "removed snapshot");
        Ok(removed)
    }

    /// Aggregate figures over the tenant's archive.
    pub fn stats(&self, tenant: &TenantId) -> Result<ArchiveStats> {
        let entries = self.list(tenant)?;
        Ok(ArchiveStats {
            count: entries.len(),
            total_bytes: entries.iter().map(|e| e.size_bytes).sum(),
            newest: entries.first().map(|e| e.created_at),
        })
    }

    /// One catalog entry, subject to the same ownership rule as `fetch`.
    pub fn entry(&self, entry_id: &str, tenant: &TenantId) -> Result<ArchiveEntry> {
        match self.catalog.get(entry_id)? {
            Some(entry) if guard::owns(tenant, &entry.tenant_id) => Ok(entry),
            _ => Err(BackupError::SnapshotNotFound),
        }
    }
}

fn blob_key_for(tenant: &TenantId, created_at: DateTime<Utc>) -> String {
    format!(
        "{}/{}-{}.json.gz",
        tenant,
        created_at.format("%Y%m%d%H%M%S"),
        Uuid::new_v4()
    )
}
