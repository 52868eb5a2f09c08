/*!
# Carnet Backup Core

Tenant snapshot and restore engine for the Carnet record-keeping system.

This crate captures the entire state owned by one tenant (students, skill
booklets, evidence photos, pending photos) into an immutable versioned
document, archives it as an addressable artifact, and can later replace all
current tenant state with a chosen artifact atomically.

One design, two deployment variants:

- **Durable**: blobs in an object store (filesystem or S3), catalog rows in a
  structured catalog store.
- **Local**: blobs inlined in an ephemeral in-memory store with a bounded
  rotating history, fed by a 30-minute timer and a session-teardown trigger.

## Architecture

Storage, catalog and record stores are ports; the engine above them is
adapter-agnostic. Ownership isolation is enforced both at the archive index
(fetch/remove) and again by the restore engine on the document's embedded
owner. Restore is wipe-and-replace inside one unit of work: all-or-nothing,
never observable half-done.

## Usage

```rust,no_run
use carnet_core::{local_engine, BackupOps, MemoryRecordStore, TenantId};

let engine = local_engine(MemoryRecordStore::new());
let tenant = TenantId::new("teacher-1");

let entry = engine.create_backup(&tenant)?;
let report = engine.restore_backup(&entry.id, &tenant)?;
# Ok::<(), carnet_core::BackupError>(())
```
*/

pub mod archive;
pub mod catalog;
pub mod compression;
pub mod config;
pub mod engine;
pub mod error;
pub mod guard;
pub mod model;
pub mod observability;
pub mod records;
pub mod restore;
pub mod retention;
pub mod snapshot;
pub mod storage;

pub use archive::{ArchiveEntry, ArchiveIndex, ArchiveStats};
pub use catalog::{CatalogStore, FsCatalog, MemoryCatalog};
pub use compression::{Compressor, GzipCompressor, NoCompression};
pub use config::{create_engine_from_config, ArchiveBackend, BackupConfig};
pub use engine::{local_engine, BackupEngine, BackupOps, LocalBackupEngine};
pub use error::{BackupError, Result};
pub use model::{
    Booklet, CollectionKind, Collections, OwnerProfile, PendingPhoto, Photo, SkillEvaluation,
    SkillStatus, Student, TenantId, DEPENDENCY_ORDER,
};
pub use records::{MemoryRecordStore, RecordStore, RecordTransaction};
pub use restore::{RestoreEngine, RestoreReport};
pub use retention::{RetentionPolicy, RetentionScheduler, SchedulerConfig, SchedulerHandle};
pub use snapshot::{Snapshot, SnapshotBuilder, SNAPSHOT_FORMAT_VERSION};
pub use storage::{BlobStore, FsBlobStore, MemoryBlobStore};
#[cfg(feature = "s3")]
pub use storage::S3BlobStore;
