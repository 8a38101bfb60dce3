use thiserror::Error;

use crate::store::StoreError;

/// Failures decoding (or, in theory, encoding) a portable document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The outer payload is not a map of at most the three known keys to
    /// byte strings.
    #[error("malformed backup document: {0}")]
    MalformedDocument(String),

    /// One section did not decode into a list of its entity type, or holds a
    /// reference that does not resolve.
    #[error("malformed '{section}' section: {reason}")]
    MalformedSection {
        section: &'static str,
        reason: String,
    },

    #[error("failed to encode backup document: {0}")]
    Encode(String),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to read local data: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// Failures from [`restore`](super::restore).
#[derive(Debug, Error)]
pub enum RestoreError {
    /// The document was rejected before any mutation; the store is untouched.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// A store write failed and the staged replacement was rolled back; the
    /// store still holds the data it had before the restore.
    #[error("restore failed while writing to the local store: {0}")]
    StoreWriteFailure(#[source] StoreError),

    /// A store write failed and the rollback failed too. The store may hold
    /// a partially replaced dataset; recover from a prior export.
    #[error(
        "restore failed ({write}) and the rollback also failed ({rollback}); \
         local data may be incomplete"
    )]
    PartialRestoreRisk {
        write: StoreError,
        rollback: StoreError,
    },
}
