/*!
Error types for the Carnet backup core.
*/

use thiserror::Error;

use crate::model::TenantId;

/// Result type used throughout the backup core.
pub type Result<T> = std::result::Result<T, BackupError>;

/// Errors that can occur during backup and restore operations.
#[derive(Error, Debug)]
pub enum BackupError {
    /// The tenant no longer exists; nothing can be captured for it
    #[error("owner not found: {0}")]
    OwnerNotFound(TenantId),

    /// The archive entry does not exist, or belongs to another tenant.
    /// Both cases are deliberately indistinguishable to the caller.
    #[error("snapshot not found")]
    SnapshotNotFound,

    /// The snapshot document was written by an incompatible major version
    #[error("unsupported snapshot version {found} (supported major: {supported})")]
    UnsupportedSnapshotVersion { found: String, supported: u64 },

    /// The snapshot's embedded owner does not match the archive entry it is
    /// filed under; the pairing is corrupted or tampered with
    #[error("snapshot owner does not match the calling tenant")]
    OwnershipMismatch,

    /// Blob or catalog adapter failures
    #[error("storage error: {0}")]
    Storage(String),

    /// Compression/decompression errors
    #[error("compression error: {0}")]
    Compression(String),

    /// Document checksum did not match the catalog entry
    #[error("integrity check failed: expected hash {expected}, got {actual}")]
    IntegrityCheckFailed { expected: String, actual: String },

    /// Malformed snapshot document
    #[error("invalid snapshot document: {0}")]
    InvalidDocument(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors during file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackupError {
    /// Create a new storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new compression error
    pub fn compression<S: Into<String>>(msg: S) -> Self {
        Self::Compression(msg.into())
    }

    /// Create a new invalid document error
    pub fn invalid_document<S: Into<String>>(msg: S) -> Self {
        Self::InvalidDocument(msg.into())
    }
}
