//! Import from an external health data store.
//!
//! The external store is the system of record for workouts recorded by other
//! apps and devices. [`HealthImporter`] pulls its workouts, translates each
//! activity code to a local [`ActivityType`](crate::models::ActivityType) and
//! upserts into a [`LocalStore`](crate::store::LocalStore) keyed by the
//! external identifier, so repeated imports never duplicate a record.

pub mod codes;
mod error;
mod importer;
mod source;

pub use codes::activity_type_for_code;
pub use error::{HealthError, TranslationError};
pub use importer::{HealthImporter, ImportReport};
pub use source::{ExternalWorkout, HealthSource};
