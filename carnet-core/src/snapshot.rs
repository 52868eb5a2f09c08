/*!
Snapshot document and builder.

A snapshot is the immutable, versioned document capturing everything one
tenant owns at one instant. The builder only reads; writing the resulting
document is the archive index's job.
*/

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{Collections, OwnerProfile, TenantId};
use crate::records::RecordStore;
use crate::{BackupError, Result};

/// Format version stamped on every document this writer produces.
pub const SNAPSHOT_FORMAT_VERSION: &str = "2.0.0";

/// Major component of [`SNAPSHOT_FORMAT_VERSION`]. Documents with a different
/// major are rejected on read; minor/patch differences are accepted as-is.
pub const SUPPORTED_MAJOR: u64 = 2;

/// The portable backup artifact.
///
/// Wire shape (stable across the durable and local variants):
///
/// ```json
/// {
///   "formatVersion": "2.0.0",
///   "createdAt": "2026-03-01T10:00:00Z",
///   "owner": { "id": "teacher-1", "email": "t@example.org" },
///   "collections": {
///     "students": [],
///     "booklets": [],
///     "photos": [],
///     "pendingPhotos": []
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub format_version: String,
    pub created_at: DateTime<Utc>,
    pub owner: OwnerProfile,
    pub collections: Collections,
}

impl Snapshot {
    /// Create a document stamped with the current writer version and capture
    /// time.
    pub fn new(owner: OwnerProfile, collections: Collections) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION.to_string(),
            created_at: Utc::now(),
            owner,
            collections,
        }
    }

    /// Serialize to the wire format.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(BackupError::Json)
    }

    /// Parse a document from the wire format, rejecting unsupported major
    /// versions.
    ///
    /// # Errors
    /// * [`BackupError::Json`] if the document is not valid JSON
    /// * [`BackupError::UnsupportedSnapshotVersion`] on a major mismatch
    /// * [`BackupError::InvalidDocument`] if the version string is malformed
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        ensure_supported_version(&snapshot.format_version)?;
        Ok(snapshot)
    }
}

/// Check a document's format version against [`SUPPORTED_MAJOR`].
pub fn ensure_supported_version(version: &str) -> Result<()> {
    let major = version
        .split('.')
        .next()
        .and_then(|part| part.parse::<u64>().ok())
        .ok_or_else(|| {
            BackupError::invalid_document(format!("malformed format version: {version:?}"))
        })?;

    if major != SUPPORTED_MAJOR {
        return Err(BackupError::UnsupportedSnapshotVersion {
            found: version.to_string(),
            supported: SUPPORTED_MAJOR,
        });
    }
    Ok(())
}

/// Gathers every entity owned by a tenant into one [`Snapshot`].
pub struct SnapshotBuilder<'a, R: RecordStore + ?Sized> {
    records: &'a R,
}

impl<'a, R: RecordStore + ?Sized> SnapshotBuilder<'a, R> {
    pub fn new(records: &'a R) -> Self {
        Self { records }
    }

    /// Capture the tenant's full state.
    ///
    /// Fail-fast: if the tenant is gone the build fails with
    /// [`BackupError::OwnerNotFound`], and any collection read error fails
    /// the whole build. A partial snapshot is never produced.
    pub fn build(&self, tenant: &TenantId) -> Result<Snapshot> {
        let owner = self
            .records
            .find_owner(tenant)?
            .ok_or_else(|| BackupError::OwnerNotFound(tenant.clone()))?;

        let collections = Collections {
            students: self.records.students(tenant)?,
            booklets: self.records.booklets(tenant)?,
            photos: self.records.photos(tenant)?,
            pending_photos: self.records.pending_photos(tenant)?,
        };

        debug!(
            tenant = %tenant,
            students = collections.students.len(),
            booklets = collections.booklets.len(),
            photos = collections.photos.len(),
            pending_photos = collections.pending_photos.len(),
            "captured tenant state"
        );

        Ok(Snapshot::new(owner, collections))
    }
}
