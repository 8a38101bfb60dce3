//! Local store collaborator.
//!
//! The backup and import code only talks to storage through [`LocalStore`].
//! Every mutation is staged until [`LocalStore::commit`]; reads observe staged
//! changes, and [`LocalStore::rollback`] discards them. That staging is what
//! lets a restore replace the whole dataset without an empty-store window.

mod memory;

use std::future::Future;

use thiserror::Error;
use uuid::Uuid;

use crate::models::{Category, Subcategory, WorkoutRecord};

pub use memory::MemoryStore;

/// Errors reported by a [`LocalStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} already exists")]
    Duplicate { entity: &'static str, id: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("{entity} {id} references missing {target} {target_id}")]
    MissingReference {
        entity: &'static str,
        id: Uuid,
        target: &'static str,
        target_id: Uuid,
    },

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Storage for workouts, categories and subcategories.
pub trait LocalStore: Send {
    /// All workouts in insertion order.
    fn workouts(&mut self) -> impl Future<Output = Result<Vec<WorkoutRecord>, StoreError>> + Send;

    fn categories(&mut self) -> impl Future<Output = Result<Vec<Category>, StoreError>> + Send;

    fn subcategories(
        &mut self,
    ) -> impl Future<Output = Result<Vec<Subcategory>, StoreError>> + Send;

    fn find_workout_by_external_id(
        &mut self,
        external_id: &str,
    ) -> impl Future<Output = Result<Option<WorkoutRecord>, StoreError>> + Send;

    fn insert_category(
        &mut self,
        category: &Category,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Fails with [`StoreError::MissingReference`] if the parent category is absent.
    fn insert_subcategory(
        &mut self,
        subcategory: &Subcategory,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Fails with [`StoreError::MissingReference`] if a referenced category or
    /// subcategory is absent, and with [`StoreError::Duplicate`] if the id or
    /// external id is already taken.
    fn insert_workout(
        &mut self,
        workout: &WorkoutRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Replaces the workout with the same id.
    fn update_workout(
        &mut self,
        workout: &WorkoutRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn delete_workout(&mut self, id: Uuid) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Deleting a category removes its subcategories and clears workout
    /// references to either.
    fn delete_category(&mut self, id: Uuid)
        -> impl Future<Output = Result<(), StoreError>> + Send;

    fn delete_subcategory(
        &mut self,
        id: Uuid,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Removes every workout, subcategory and category.
    fn delete_all(&mut self) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn commit(&mut self) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn rollback(&mut self) -> impl Future<Output = Result<(), StoreError>> + Send;
}
