//! Backup and restore of the local dataset.
//!
//! A backup is a single portable document: a CBOR map with up to three keys,
//! `workouts`, `categories` and `subcategories`, each holding a byte string
//! that is itself a JSON array of the matching entities. Dates inside the
//! sections are ISO-8601 with an offset, at second precision.
//!
//! ## Restore
//!
//! [`restore`] decodes and validates the whole document before touching the
//! store, then replaces the dataset inside one staged store transaction. See
//! [`RestoreError`] for what each failure leaves behind.

mod document;
mod error;
mod restore;

use tracing::info;

use crate::store::LocalStore;

pub use document::{
    decode, encode, Snapshot, BACKUP_FILE_NAME, CATEGORIES_KEY, SUBCATEGORIES_KEY, WORKOUTS_KEY,
};
pub use error::{DocumentError, ExportError, RestoreError};
pub use restore::{restore, RestoreSummary};

/// Reads every record from `store` and encodes it as a portable document.
///
/// Only reads are issued; nothing is staged or committed.
pub async fn export<L: LocalStore>(store: &mut L) -> Result<Vec<u8>, ExportError> {
    let workouts = store.workouts().await?;
    let categories = store.categories().await?;
    let subcategories = store.subcategories().await?;

    let bytes = encode(&workouts, &categories, &subcategories)?;
    info!(
        workouts = workouts.len(),
        categories = categories.len(),
        subcategories = subcategories.len(),
        bytes = bytes.len(),
        "Exported backup document"
    );
    Ok(bytes)
}
