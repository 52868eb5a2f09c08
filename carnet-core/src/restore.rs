/*!
Restore engine: atomic wipe-and-replace of one tenant's state.

Restore is deliberately destructive: everything the tenant currently owns is
deleted and the snapshot's entities are recreated with their original ids,
inside one unit of work. Anything created after the snapshot was taken is
lost. On any failure before commit the transaction is dropped and the
tenant's prior state is preserved unchanged; no partially-restored state is
ever observable.
*/

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, warn};

use crate::archive::ArchiveIndex;
use crate::catalog::CatalogStore;
use crate::compression::Compressor;
use crate::guard;
use crate::model::{CollectionKind, Collections, TenantId, DEPENDENCY_ORDER};
use crate::records::RecordStore;
use crate::snapshot::Snapshot;
use crate::storage::BlobStore;
use crate::{BackupError, Result};

/// Per-collection counts returned for caller-visible confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    pub students_count: usize,
    pub booklets_count: usize,
    pub photos_count: usize,
    pub pending_photos_count: usize,
}

/// Replaces a tenant's current state with a snapshot's contents.
pub struct RestoreEngine<'a, R: RecordStore + ?Sized> {
    records: &'a R,
}

impl<'a, R: RecordStore + ?Sized> RestoreEngine<'a, R> {
    pub fn new(records: &'a R) -> Self {
        Self { records }
    }

    /// Restore from an archived snapshot.
    ///
    /// The fetch inherits the archive index's ownership check; the document's
    /// embedded owner is then re-verified here against the calling tenant.
    /// Both checks are enforced independently.
    pub fn restore<B, C, Z>(
        &self,
        index: &ArchiveIndex<B, C, Z>,
        entry_id: &str,
        tenant: &TenantId,
    ) -> Result<RestoreReport>
    where
        B: BlobStore,
        C: CatalogStore,
        Z: Compressor,
    {
        let snapshot = index.fetch(entry_id, tenant)?;
        self.restore_snapshot(snapshot, tenant)
    }

    /// Restore from an uploaded document (the local variant's import path).
    /// Version and ownership gates apply exactly as for archived snapshots.
    pub fn restore_document(&self, document: &str, tenant: &TenantId) -> Result<RestoreReport> {
        let snapshot = Snapshot::from_json(document)?;
        self.restore_snapshot(snapshot, tenant)
    }

    /// Wipe-and-replace with an already-parsed snapshot.
    pub fn restore_snapshot(&self, snapshot: Snapshot, tenant: &TenantId) -> Result<RestoreReport> {
        // The catalog is metadata; the blob is authoritative. Re-verify the
        // document's embedded owner regardless of how it was obtained.
        if !guard::owns(tenant, &snapshot.owner.id) {
            return Err(BackupError::OwnershipMismatch);
        }

        let collections = normalize(snapshot.collections, tenant);

        let mut tx = self.records.begin(tenant)?;

        // Children before parents on the way down...
        for kind in DEPENDENCY_ORDER.iter().rev() {
            tx.wipe(*kind)?;
        }

        // ...parents before children on the way back up, so references
        // resolve as they are created.
        for kind in DEPENDENCY_ORDER {
            match kind {
                CollectionKind::Students => tx.insert_students(&collections.students)?,
                CollectionKind::Booklets => tx.insert_booklets(&collections.booklets)?,
                CollectionKind::Photos => tx.insert_photos(&collections.photos)?,
                CollectionKind::PendingPhotos => {
                    tx.insert_pending_photos(&collections.pending_photos)?
                }
            }
        }

        tx.commit()?;

        let report = RestoreReport {
            students_count: collections.len_of(CollectionKind::Students),
            booklets_count: collections.len_of(CollectionKind::Booklets),
            photos_count: collections.len_of(CollectionKind::Photos),
            pending_photos_count: collections.len_of(CollectionKind::PendingPhotos),
        };
        info!(
            tenant = %tenant,
            students = report.students_count,
            booklets = report.booklets_count,
            photos = report.photos_count,
            pending_photos = report.pending_photos_count,
            "restored tenant state"
        );
        Ok(report)
    }
}

/// Resolve intra-snapshot references and re-stamp ownership before insertion.
///
/// Dangling references are not permitted to survive into restored state: a
/// photo pointing at a student or booklet absent from the snapshot has that
/// reference nulled; a booklet whose student is absent is dropped outright,
/// its student reference being mandatory. Every entity is re-stamped with the
/// calling tenant id so a document cannot smuggle rows into another tenant.
fn normalize(mut collections: Collections, tenant: &TenantId) -> Collections {
    let student_ids: HashSet<&str> = collections
        .students
        .iter()
        .map(|s| s.id.as_str())
        .collect();

    let booklets_before = collections.booklets.len();
    collections
        .booklets
        .retain(|b| student_ids.contains(b.student_id.as_str()));
    let dropped = booklets_before - collections.booklets.len();
    if dropped > 0 {
        warn!(tenant = %tenant, dropped, "dropped booklets referencing absent students");
    }

    let booklet_ids: HashSet<String> = collections
        .booklets
        .iter()
        .map(|b| b.id.clone())
        .collect();
    let student_ids: HashSet<String> = collections
        .students
        .iter()
        .map(|s| s.id.clone())
        .collect();

    for photo in &mut collections.photos {
        if let Some(id) = &photo.student_id {
            if !student_ids.contains(id) {
                warn!(tenant = %tenant, photo = %photo.id, "nulled dangling student reference");
                photo.student_id = None;
            }
        }
        if let Some(id) = &photo.booklet_id {
            if !booklet_ids.contains(id) {
                warn!(tenant = %tenant, photo = %photo.id, "nulled dangling booklet reference");
                photo.booklet_id = None;
            }
        }
    }

    for student in &mut collections.students {
        student.tenant_id = tenant.clone();
    }
    for booklet in &mut collections.booklets {
        booklet.tenant_id = tenant.clone();
    }
    for photo in &mut collections.photos {
        photo.tenant_id = tenant.clone();
    }
    for pending in &mut collections.pending_photos {
        pending.tenant_id = tenant.clone();
    }

    collections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Booklet, OwnerProfile, Photo, Student};
    use crate::records::MemoryRecordStore;
    use chrono::Utc;

    fn owner(id: &str) -> OwnerProfile {
        OwnerProfile {
            id: TenantId::new(id),
            email: format!("{id}@example.org"),
        }
    }

    fn student(id: &str, tenant: &str) -> Student {
        Student {
            id: id.to_string(),
            tenant_id: TenantId::new(tenant),
            first_name: "Ada".to_string(),
            last_name: "L.".to_string(),
            birth_date: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    fn booklet(id: &str, tenant: &str, student_id: &str) -> Booklet {
        Booklet {
            id: id.to_string(),
            tenant_id: TenantId::new(tenant),
            student_id: student_id.to_string(),
            school_year: "2025-2026".to_string(),
            skills: Vec::new(),
            synthesis: None,
            updated_at: Utc::now(),
        }
    }

    fn photo(id: &str, tenant: &str, student_id: Option<&str>, booklet_id: Option<&str>) -> Photo {
        Photo {
            id: id.to_string(),
            tenant_id: TenantId::new(tenant),
            student_id: student_id.map(str::to_string),
            booklet_id: booklet_id.map(str::to_string),
            file_key: format!("media/{id}.jpg"),
            caption: None,
            taken_at: Utc::now(),
        }
    }

    #[test]
    fn test_restore_snapshot_replaces_current_state() {
        let store = MemoryRecordStore::new();
        store.register_owner(owner("t1"));
        store.add_student(student("stale", "t1"));

        let snapshot = Snapshot::new(
            owner("t1"),
            Collections {
                students: vec![student("s1", "t1"), student("s2", "t1")],
                booklets: vec![booklet("b1", "t1", "s1")],
                photos: vec![photo("p1", "t1", Some("s1"), Some("b1"))],
                pending_photos: Vec::new(),
            },
        );

        let tenant = TenantId::new("t1");
        let report = RestoreEngine::new(&store)
            .restore_snapshot(snapshot, &tenant)
            .unwrap();

        assert_eq!(report.students_count, 2);
        assert_eq!(report.booklets_count, 1);
        assert_eq!(report.photos_count, 1);
        assert_eq!(report.pending_photos_count, 0);

        let students = store.students(&tenant).unwrap();
        assert_eq!(students.len(), 2);
        assert!(students.iter().all(|s| s.id != "stale"));
    }

    #[test]
    fn test_restore_rejects_foreign_owner_with_zero_writes() {
        let store = MemoryRecordStore::new();
        store.register_owner(owner("t1"));
        store.add_student(student("keep", "t1"));

        let snapshot = Snapshot::new(
            owner("t2"),
            Collections {
                students: vec![student("intruder", "t2")],
                ..Collections::default()
            },
        );

        let tenant = TenantId::new("t1");
        let err = RestoreEngine::new(&store)
            .restore_snapshot(snapshot, &tenant)
            .unwrap_err();
        assert!(matches!(err, BackupError::OwnershipMismatch));

        // Zero writes happened
        let students = store.students(&tenant).unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].id, "keep");
    }

    #[test]
    fn test_normalize_nulls_dangling_photo_references() {
        let tenant = TenantId::new("t1");
        let collections = Collections {
            students: vec![student("s1", "t1")],
            booklets: vec![booklet("b1", "t1", "s1")],
            photos: vec![
                photo("ok", "t1", Some("s1"), Some("b1")),
                photo("dangling", "t1", Some("gone"), Some("also-gone")),
            ],
            pending_photos: Vec::new(),
        };

        let normalized = normalize(collections, &tenant);
        let dangling = normalized.photos.iter().find(|p| p.id == "dangling").unwrap();
        assert!(dangling.student_id.is_none());
        assert!(dangling.booklet_id.is_none());

        let ok = normalized.photos.iter().find(|p| p.id == "ok").unwrap();
        assert_eq!(ok.student_id.as_deref(), Some("s1"));
        assert_eq!(ok.booklet_id.as_deref(), Some("b1"));
    }

    #[test]
    fn test_normalize_drops_orphan_booklets() {
        let tenant = TenantId::new("t1");
        let collections = Collections {
            students: vec![student("s1", "t1")],
            booklets: vec![booklet("b1", "t1", "s1"), booklet("orphan", "t1", "gone")],
            photos: Vec::new(),
            pending_photos: Vec::new(),
        };

        let normalized = normalize(collections, &tenant);
        assert_eq!(normalized.booklets.len(), 1);
        assert_eq!(normalized.booklets[0].id, "b1");
    }

    #[test]
    fn test_normalize_restamps_tenant_ids() {
        let tenant = TenantId::new("t1");
        let collections = Collections {
            students: vec![student("s1", "elsewhere")],
            ..Collections::default()
        };

        let normalized = normalize(collections, &tenant);
        assert_eq!(normalized.students[0].tenant_id, tenant);
    }

    #[test]
    fn test_restore_document_version_gate() {
        let store = MemoryRecordStore::new();
        let engine = RestoreEngine::new(&store);
        let tenant = TenantId::new("t1");

        let document = r#"{
            "formatVersion": "9.0.0",
            "createdAt": "2026-03-01T10:00:00Z",
            "owner": {"id": "t1", "email": "t1@example.org"},
            "collections": {"students": [], "booklets": [], "photos": [], "pendingPhotos": []}
        }"#;

        let err = engine.restore_document(document, &tenant).unwrap_err();
        assert!(matches!(
            err,
            BackupError::UnsupportedSnapshotVersion { .. }
        ));
    }
}
