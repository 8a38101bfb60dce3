//! Fitvault Core Library
//!
//! Workout models, the portable backup document, destructive restore and
//! health-store import shared by fitvault front-ends.

pub mod backup;
pub mod health;
pub mod models;
pub mod store;

pub use backup::{
    decode, encode, export, restore, DocumentError, ExportError, RestoreError, RestoreSummary,
    Snapshot, BACKUP_FILE_NAME,
};
pub use health::{
    activity_type_for_code, ExternalWorkout, HealthError, HealthImporter, HealthSource,
    ImportReport, TranslationError,
};
pub use models::{ActivityType, Category, Subcategory, WorkoutRecord};
pub use store::{LocalStore, MemoryStore, StoreError};
