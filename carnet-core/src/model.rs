/*!
Domain entities captured by and restored from snapshots.

Every entity carries its stable `id` and its `tenant_id`. Snapshots store the
entities fully denormalized so a restore can recreate identical ids and field
values without consulting any other source.
*/

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of the ownership boundary: one teacher account on the
/// server, one browser profile in the local variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identity fields embedded in a snapshot's `owner` block. The id is what the
/// ownership check compares; the email is descriptive data carried along so a
/// document remains attributable on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerProfile {
    pub id: TenantId,
    pub email: String,
}

/// A student in the teacher's class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub tenant_id: TenantId,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Evaluation status of one skill inside a booklet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkillStatus {
    NotStarted,
    InProgress,
    Acquired,
}

/// One evaluated skill line inside a booklet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillEvaluation {
    /// Stable curriculum code of the skill (e.g. "MS.LANG.03")
    pub skill_code: String,
    /// Curriculum area the skill belongs to
    pub domain: String,
    pub status: SkillStatus,
    pub comment: Option<String>,
    pub evaluated_at: Option<DateTime<Utc>>,
}

/// A per-student skill-tracking booklet ("carnet de suivi").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booklet {
    pub id: String,
    pub tenant_id: TenantId,
    /// Owning student; a booklet never exists without one
    pub student_id: String,
    pub school_year: String,
    pub skills: Vec<SkillEvaluation>,
    /// Free-text synthesis written by the teacher
    pub synthesis: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// An evidence photo, attributed to a student and optionally to a booklet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: String,
    pub tenant_id: TenantId,
    pub student_id: Option<String>,
    pub booklet_id: Option<String>,
    /// Key of the image bytes in the application's media store
    pub file_key: String,
    pub caption: Option<String>,
    pub taken_at: DateTime<Utc>,
}

/// A photo that has been uploaded but not yet attributed to a student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPhoto {
    pub id: String,
    pub tenant_id: TenantId,
    pub file_key: String,
    pub uploaded_at: DateTime<Utc>,
}

/// The entity collections a snapshot captures, one per entity type.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collections {
    pub students: Vec<Student>,
    pub booklets: Vec<Booklet>,
    pub photos: Vec<Photo>,
    pub pending_photos: Vec<PendingPhoto>,
}

impl Collections {
    /// Number of entities in the given collection.
    pub fn len_of(&self, kind: CollectionKind) -> usize {
        match kind {
            CollectionKind::Students => self.students.len(),
            CollectionKind::Booklets => self.booklets.len(),
            CollectionKind::Photos => self.photos.len(),
            CollectionKind::PendingPhotos => self.pending_photos.len(),
        }
    }
}

/// The entity types a tenant owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Students,
    Booklets,
    Photos,
    PendingPhotos,
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CollectionKind::Students => "students",
            CollectionKind::Booklets => "booklets",
            CollectionKind::Photos => "photos",
            CollectionKind::PendingPhotos => "pendingPhotos",
        };
        f.write_str(name)
    }
}

/// Collections ordered parents-first. A restore wipes current state iterating
/// this list in reverse (children before parents, respecting foreign keys
/// where the underlying store enforces them) and re-inserts iterating it
/// forward, so references resolve as they are created. Declared once, used by
/// both phases.
pub const DEPENDENCY_ORDER: [CollectionKind; 4] = [
    CollectionKind::Students,
    CollectionKind::Booklets,
    CollectionKind::Photos,
    CollectionKind::PendingPhotos,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_id_display_and_transparency() {
        let tenant = TenantId::new("teacher-7");
        assert_eq!(tenant.to_string(), "teacher-7");
        assert_eq!(serde_json::to_string(&tenant).unwrap(), "\"teacher-7\"");
    }

    #[test]
    fn test_dependency_order_is_parents_first() {
        assert_eq!(DEPENDENCY_ORDER[0], CollectionKind::Students);
        assert_eq!(DEPENDENCY_ORDER[1], CollectionKind::Booklets);
        // Photos reference both students and booklets, so they come after
        assert_eq!(DEPENDENCY_ORDER[2], CollectionKind::Photos);
        assert_eq!(DEPENDENCY_ORDER[3], CollectionKind::PendingPhotos);
    }

    #[test]
    fn test_skill_status_wire_format() {
        let status = SkillStatus::InProgress;
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"inProgress\"");
    }
}
