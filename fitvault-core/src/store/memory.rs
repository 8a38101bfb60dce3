//! In-memory [`LocalStore`] used by tests and embedders without a database.

use uuid::Uuid;

use super::{LocalStore, StoreError};
use crate::models::{Category, Subcategory, WorkoutRecord};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Tables {
    workouts: Vec<WorkoutRecord>,
    categories: Vec<Category>,
    subcategories: Vec<Subcategory>,
}

impl Tables {
    fn has_category(&self, id: Uuid) -> bool {
        self.categories.iter().any(|c| c.id == id)
    }

    fn has_subcategory(&self, id: Uuid) -> bool {
        self.subcategories.iter().any(|s| s.id == id)
    }

    fn insert_category(&mut self, category: &Category) -> Result<(), StoreError> {
        if self.has_category(category.id) {
            return Err(StoreError::Duplicate {
                entity: "category",
                id: category.id.to_string(),
            });
        }
        self.categories.push(category.clone());
        Ok(())
    }

    fn insert_subcategory(&mut self, subcategory: &Subcategory) -> Result<(), StoreError> {
        if self.has_subcategory(subcategory.id) {
            return Err(StoreError::Duplicate {
                entity: "subcategory",
                id: subcategory.id.to_string(),
            });
        }
        if !self.has_category(subcategory.category_id) {
            return Err(StoreError::MissingReference {
                entity: "subcategory",
                id: subcategory.id,
                target: "category",
                target_id: subcategory.category_id,
            });
        }
        self.subcategories.push(subcategory.clone());
        Ok(())
    }

    fn check_workout_references(&self, workout: &WorkoutRecord) -> Result<(), StoreError> {
        if let Some(category_id) = workout.category_id {
            if !self.has_category(category_id) {
                return Err(StoreError::MissingReference {
                    entity: "workout",
                    id: workout.id,
                    target: "category",
                    target_id: category_id,
                });
            }
        }
        if let Some(subcategory_id) = workout.subcategory_id {
            if !self.has_subcategory(subcategory_id) {
                return Err(StoreError::MissingReference {
                    entity: "workout",
                    id: workout.id,
                    target: "subcategory",
                    target_id: subcategory_id,
                });
            }
        }
        Ok(())
    }

    fn external_id_taken(&self, workout: &WorkoutRecord) -> bool {
        match &workout.external_id {
            Some(ext) => self
                .workouts
                .iter()
                .any(|w| w.id != workout.id && w.external_id.as_ref() == Some(ext)),
            None => false,
        }
    }

    fn insert_workout(&mut self, workout: &WorkoutRecord) -> Result<(), StoreError> {
        if self.workouts.iter().any(|w| w.id == workout.id) {
            return Err(StoreError::Duplicate {
                entity: "workout",
                id: workout.id.to_string(),
            });
        }
        if self.external_id_taken(workout) {
            return Err(StoreError::Duplicate {
                entity: "external id",
                id: workout.external_id.clone().unwrap_or_default(),
            });
        }
        self.check_workout_references(workout)?;
        self.workouts.push(workout.clone());
        Ok(())
    }

    fn update_workout(&mut self, workout: &WorkoutRecord) -> Result<(), StoreError> {
        self.check_workout_references(workout)?;
        if self.external_id_taken(workout) {
            return Err(StoreError::Duplicate {
                entity: "external id",
                id: workout.external_id.clone().unwrap_or_default(),
            });
        }
        let slot = self
            .workouts
            .iter_mut()
            .find(|w| w.id == workout.id)
            .ok_or(StoreError::NotFound {
                entity: "workout",
                id: workout.id,
            })?;
        *slot = workout.clone();
        Ok(())
    }

    fn delete_workout(&mut self, id: Uuid) -> Result<(), StoreError> {
        let before = self.workouts.len();
        self.workouts.retain(|w| w.id != id);
        if self.workouts.len() == before {
            return Err(StoreError::NotFound {
                entity: "workout",
                id,
            });
        }
        Ok(())
    }

    fn delete_subcategory(&mut self, id: Uuid) -> Result<(), StoreError> {
        let before = self.subcategories.len();
        self.subcategories.retain(|s| s.id != id);
        if self.subcategories.len() == before {
            return Err(StoreError::NotFound {
                entity: "subcategory",
                id,
            });
        }
        for workout in &mut self.workouts {
            if workout.subcategory_id == Some(id) {
                workout.subcategory_id = None;
            }
        }
        Ok(())
    }

    fn delete_category(&mut self, id: Uuid) -> Result<(), StoreError> {
        let before = self.categories.len();
        self.categories.retain(|c| c.id != id);
        if self.categories.len() == before {
            return Err(StoreError::NotFound {
                entity: "category",
                id,
            });
        }
        let orphaned: Vec<Uuid> = self
            .subcategories
            .iter()
            .filter(|s| s.category_id == id)
            .map(|s| s.id)
            .collect();
        for sub_id in orphaned {
            self.delete_subcategory(sub_id)?;
        }
        for workout in &mut self.workouts {
            if workout.category_id == Some(id) {
                workout.category_id = None;
            }
        }
        Ok(())
    }
}

/// A [`LocalStore`] kept entirely in memory.
///
/// The first mutation after a commit copies the committed tables into a
/// staging area; `commit` swaps the staged copy in, `rollback` drops it.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    committed: Tables,
    staged: Option<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if there are mutations waiting for `commit`.
    pub fn has_pending_changes(&self) -> bool {
        self.staged
            .as_ref()
            .is_some_and(|staged| *staged != self.committed)
    }

    /// Committed record counts as (workouts, categories, subcategories).
    pub fn committed_counts(&self) -> (usize, usize, usize) {
        (
            self.committed.workouts.len(),
            self.committed.categories.len(),
            self.committed.subcategories.len(),
        )
    }

    fn view(&self) -> &Tables {
        self.staged.as_ref().unwrap_or(&self.committed)
    }

    fn stage(&mut self) -> &mut Tables {
        let committed = &self.committed;
        self.staged.get_or_insert_with(|| committed.clone())
    }
}

impl LocalStore for MemoryStore {
    async fn workouts(&mut self) -> Result<Vec<WorkoutRecord>, StoreError> {
        Ok(self.view().workouts.clone())
    }

    async fn categories(&mut self) -> Result<Vec<Category>, StoreError> {
        Ok(self.view().categories.clone())
    }

    async fn subcategories(&mut self) -> Result<Vec<Subcategory>, StoreError> {
        Ok(self.view().subcategories.clone())
    }

    async fn find_workout_by_external_id(
        &mut self,
        external_id: &str,
    ) -> Result<Option<WorkoutRecord>, StoreError> {
        Ok(self
            .view()
            .workouts
            .iter()
            .find(|w| w.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn insert_category(&mut self, category: &Category) -> Result<(), StoreError> {
        self.stage().insert_category(category)
    }

    async fn insert_subcategory(&mut self, subcategory: &Subcategory) -> Result<(), StoreError> {
        self.stage().insert_subcategory(subcategory)
    }

    async fn insert_workout(&mut self, workout: &WorkoutRecord) -> Result<(), StoreError> {
        self.stage().insert_workout(workout)
    }

    async fn update_workout(&mut self, workout: &WorkoutRecord) -> Result<(), StoreError> {
        self.stage().update_workout(workout)
    }

    async fn delete_workout(&mut self, id: Uuid) -> Result<(), StoreError> {
        self.stage().delete_workout(id)
    }

    async fn delete_category(&mut self, id: Uuid) -> Result<(), StoreError> {
        self.stage().delete_category(id)
    }

    async fn delete_subcategory(&mut self, id: Uuid) -> Result<(), StoreError> {
        self.stage().delete_subcategory(id)
    }

    async fn delete_all(&mut self) -> Result<(), StoreError> {
        *self.stage() = Tables::default();
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        if let Some(staged) = self.staged.take() {
            self.committed = staged;
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.staged = None;
        Ok(())
    }
}
