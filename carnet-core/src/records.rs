/*!
Structured record store ports.

[`RecordStore`] is the read side the snapshot builder consumes;
[`RecordTransaction`] is the single atomic unit of work the restore engine
runs its wipe-and-replace inside. The production relational client implements
these ports; [`MemoryRecordStore`] is the local variant's structured store and
the test double.
*/

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::model::{
    Booklet, CollectionKind, OwnerProfile, PendingPhoto, Photo, Student, TenantId,
};
use crate::Result;

/// Read access to everything a tenant owns.
///
/// All reads are tenant-scoped; implementations must never return another
/// tenant's rows.
pub trait RecordStore: Send + Sync {
    /// Look up the tenant's identity profile, `None` if the tenant no longer
    /// exists
    fn find_owner(&self, tenant: &TenantId) -> Result<Option<OwnerProfile>>;

    fn students(&self, tenant: &TenantId) -> Result<Vec<Student>>;

    fn booklets(&self, tenant: &TenantId) -> Result<Vec<Booklet>>;

    fn photos(&self, tenant: &TenantId) -> Result<Vec<Photo>>;

    fn pending_photos(&self, tenant: &TenantId) -> Result<Vec<PendingPhoto>>;

    /// Open one atomic unit of work scoped to the tenant. Mutations become
    /// visible only on [`RecordTransaction::commit`]; dropping the
    /// transaction without committing discards them.
    fn begin(&self, tenant: &TenantId) -> Result<Box<dyn RecordTransaction + '_>>;
}

/// Mutations staged inside one unit of work.
pub trait RecordTransaction {
    /// Delete every row of the given collection owned by the transaction's
    /// tenant; returns the number of rows removed
    fn wipe(&mut self, kind: CollectionKind) -> Result<u64>;

    fn insert_students(&mut self, rows: &[Student]) -> Result<()>;

    fn insert_booklets(&mut self, rows: &[Booklet]) -> Result<()>;

    fn insert_photos(&mut self, rows: &[Photo]) -> Result<()>;

    fn insert_pending_photos(&mut self, rows: &[PendingPhoto]) -> Result<()>;

    /// Make all staged mutations visible at once
    fn commit(self: Box<Self>) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
struct Tables {
    owners: HashMap<TenantId, OwnerProfile>,
    students: Vec<Student>,
    booklets: Vec<Booklet>,
    photos: Vec<Photo>,
    pending_photos: Vec<PendingPhoto>,
}

/// In-memory record store with copy-on-write transactions: `begin` clones the
/// current tables, mutations hit the clone, `commit` swaps it in. Concurrent
/// committers are not mutually excluded; the last commit wins, matching the
/// isolation the engine is specified against.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tenant's identity profile
    pub fn register_owner(&self, profile: OwnerProfile) {
        let mut tables = self.tables.lock().unwrap();
        tables.owners.insert(profile.id.clone(), profile);
    }

    pub fn add_student(&self, row: Student) {
        self.tables.lock().unwrap().students.push(row);
    }

    pub fn add_booklet(&self, row: Booklet) {
        self.tables.lock().unwrap().booklets.push(row);
    }

    pub fn add_photo(&self, row: Photo) {
        self.tables.lock().unwrap().photos.push(row);
    }

    pub fn add_pending_photo(&self, row: PendingPhoto) {
        self.tables.lock().unwrap().pending_photos.push(row);
    }
}

impl RecordStore for MemoryRecordStore {
    fn find_owner(&self, tenant: &TenantId) -> Result<Option<OwnerProfile>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.owners.get(tenant).cloned())
    }

    fn students(&self, tenant: &TenantId) -> Result<Vec<Student>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .students
            .iter()
            .filter(|s| &s.tenant_id == tenant)
            .cloned()
            .collect())
    }

    fn booklets(&self, tenant: &TenantId) -> Result<Vec<Booklet>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .booklets
            .iter()
            .filter(|b| &b.tenant_id == tenant)
            .cloned()
            .collect())
    }

    fn photos(&self, tenant: &TenantId) -> Result<Vec<Photo>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .photos
            .iter()
            .filter(|p| &p.tenant_id == tenant)
            .cloned()
            .collect())
    }

    fn pending_photos(&self, tenant: &TenantId) -> Result<Vec<PendingPhoto>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .pending_photos
            .iter()
            .filter(|p| &p.tenant_id == tenant)
            .cloned()
            .collect())
    }

    fn begin(&self, tenant: &TenantId) -> Result<Box<dyn RecordTransaction + '_>> {
        let stage = self.tables.lock().unwrap().clone();
        Ok(Box::new(MemoryTransaction {
            store: self,
            tenant: tenant.clone(),
            stage,
        }))
    }
}

struct MemoryTransaction<'a> {
    store: &'a MemoryRecordStore,
    tenant: TenantId,
    stage: Tables,
}

impl MemoryTransaction<'_> {
    fn retain_foreign<T, F>(rows: &mut Vec<T>, tenant: &TenantId, tenant_of: F) -> u64
    where
        F: Fn(&T) -> &TenantId,
    {
        let before = rows.len();
        rows.retain(|row| tenant_of(row) != tenant);
        (before - rows.len()) as u64
    }
}

impl RecordTransaction for MemoryTransaction<'_> {
    fn wipe(&mut self, kind: CollectionKind) -> Result<u64> {
        let tenant = &self.tenant;
        let removed = match kind {
            CollectionKind::Students => {
                Self::retain_foreign(&mut self.stage.students, tenant, |r| &r.tenant_id)
            }
            CollectionKind::Booklets => {
                Self::retain_foreign(&mut self.stage.booklets, tenant, |r| &r.tenant_id)
            }
            CollectionKind::Photos => {
                Self::retain_foreign(&mut self.stage.photos, tenant, |r| &r.tenant_id)
            }
            CollectionKind::PendingPhotos => {
                Self::retain_foreign(&mut self.stage.pending_photos, tenant, |r| &r.tenant_id)
            }
        };
        Ok(removed)
    }

    fn insert_students(&mut self, rows: &[Student]) -> Result<()> {
        self.stage.students.extend_from_slice(rows);
        Ok(())
    }

    fn insert_booklets(&mut self, rows: &[Booklet]) -> Result<()> {
        self.stage.booklets.extend_from_slice(rows);
        Ok(())
    }

    fn insert_photos(&mut self, rows: &[Photo]) -> Result<()> {
        self.stage.photos.extend_from_slice(rows);
        Ok(())
    }

    fn insert_pending_photos(&mut self, rows: &[PendingPhoto]) -> Result<()> {
        self.stage.pending_photos.extend_from_slice(rows);
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        let mut tables = self.store.tables.lock().unwrap();
        *tables = self.stage;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

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

    #[test]
    fn test_reads_are_tenant_scoped() {
        let store = MemoryRecordStore::new();
        store.add_student(student("s1", "t1"));
        store.add_student(student("s2", "t2"));

        let t1 = TenantId::new("t1");
        let rows = store.students(&t1).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "s1");
    }

    #[test]
    fn test_wipe_leaves_other_tenants_untouched() {
        let store = MemoryRecordStore::new();
        store.add_student(student("s1", "t1"));
        store.add_student(student("s2", "t2"));

        let t1 = TenantId::new("t1");
        let mut tx = store.begin(&t1).unwrap();
        assert_eq!(tx.wipe(CollectionKind::Students).unwrap(), 1);
        tx.commit().unwrap();

        assert!(store.students(&t1).unwrap().is_empty());
        assert_eq!(store.students(&TenantId::new("t2")).unwrap().len(), 1);
    }

    #[test]
    fn test_dropped_transaction_discards_mutations() {
        let store = MemoryRecordStore::new();
        store.add_student(student("s1", "t1"));

        let t1 = TenantId::new("t1");
        {
            let mut tx = store.begin(&t1).unwrap();
            tx.wipe(CollectionKind::Students).unwrap();
            // dropped without commit
        }

        assert_eq!(store.students(&t1).unwrap().len(), 1);
    }

    #[test]
    fn test_commit_makes_mutations_visible() {
        let store = MemoryRecordStore::new();
        let t1 = TenantId::new("t1");

        let mut tx = store.begin(&t1).unwrap();
        tx.insert_students(&[student("s1", "t1")]).unwrap();
        tx.commit().unwrap();

        assert_eq!(store.students(&t1).unwrap().len(), 1);
    }
}
