use thiserror::Error;

use crate::store::StoreError;

/// Failures that abort a whole import.
#[derive(Debug, Error)]
pub enum HealthError {
    /// Read access to the health store has not been granted.
    #[error("health data access has not been authorized")]
    AuthorizationDenied,

    #[error("health data source unreachable: {0}")]
    SourceUnreachable(String),

    #[error("failed to save imported workout: {0}")]
    Store(#[from] StoreError),
}

/// Why a single external record was skipped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TranslationError {
    #[error("record has no external identifier")]
    MissingIdentifier,

    #[error("record {external_id} has invalid duration {seconds}s")]
    InvalidDuration { external_id: String, seconds: f64 },
}
