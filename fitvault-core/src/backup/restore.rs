use tracing::{error, info, warn};

use super::document::{decode, Snapshot};
use super::error::RestoreError;
use crate::store::{LocalStore, StoreError};

/// Record counts for one restore.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    pub removed_workouts: usize,
    pub removed_categories: usize,
    pub removed_subcategories: usize,
    pub restored_workouts: usize,
    pub restored_categories: usize,
    pub restored_subcategories: usize,
}

/// Replaces everything in `store` with the content of `document`.
///
/// The document is fully decoded and its references checked before the first
/// mutation, so a rejected document never deletes anything. The replacement
/// itself is staged: categories, then subcategories, then workouts are
/// inserted after the delete, and nothing is visible to other readers until
/// the final commit. On a store failure the staged work is rolled back.
///
/// The dataset is replaced irreversibly once this returns `Ok`; take an
/// export first if the current data matters.
pub async fn restore<L: LocalStore>(
    document: &[u8],
    store: &mut L,
) -> Result<RestoreSummary, RestoreError> {
    let snapshot = decode(document)?;
    snapshot.validate_references()?;

    match replace(&snapshot, store).await {
        Ok(summary) => {
            info!(
                workouts = summary.restored_workouts,
                categories = summary.restored_categories,
                subcategories = summary.restored_subcategories,
                "Restored backup document"
            );
            Ok(summary)
        }
        Err(write) => match store.rollback().await {
            Ok(()) => {
                warn!("Restore rolled back after store failure: {}", write);
                Err(RestoreError::StoreWriteFailure(write))
            }
            Err(rollback) => {
                error!(
                    "Restore failed ({}) and rollback failed ({}); local data may be incomplete",
                    write, rollback
                );
                Err(RestoreError::PartialRestoreRisk { write, rollback })
            }
        },
    }
}

async fn replace<L: LocalStore>(
    snapshot: &Snapshot,
    store: &mut L,
) -> Result<RestoreSummary, StoreError> {
    let summary = RestoreSummary {
        removed_workouts: store.workouts().await?.len(),
        removed_categories: store.categories().await?.len(),
        removed_subcategories: store.subcategories().await?.len(),
        restored_workouts: snapshot.workouts.len(),
        restored_categories: snapshot.categories.len(),
        restored_subcategories: snapshot.subcategories.len(),
    };

    store.delete_all().await?;

    // Reference targets go in before anything that points at them.
    for category in &snapshot.categories {
        store.insert_category(category).await?;
    }
    for subcategory in &snapshot.subcategories {
        store.insert_subcategory(subcategory).await?;
    }
    for workout in &snapshot.workouts {
        store.insert_workout(workout).await?;
    }

    store.commit().await?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::{encode, DocumentError};
    use crate::models::{ActivityType, Category, Subcategory, WorkoutRecord};
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;
    use uuid::Uuid;

    fn workout(activity_type: ActivityType) -> WorkoutRecord {
        let date = Utc.with_ymd_and_hms(2025, 4, 10, 6, 15, 0).unwrap();
        WorkoutRecord::new(activity_type, 40, date)
    }

    async fn seeded_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        let category = Category::new("Old");
        store.insert_category(&category).await.unwrap();
        store
            .insert_workout(&workout(ActivityType::Other).with_category(category.id))
            .await
            .unwrap();
        store
            .insert_workout(&workout(ActivityType::Swimming))
            .await
            .unwrap();
        store.commit().await.unwrap();
        store
    }

    fn backup() -> (Vec<u8>, Snapshot) {
        let gym = Category::new("Gym");
        let legs = Subcategory::new("Legs", gym.id);
        let snapshot = Snapshot {
            workouts: vec![
                workout(ActivityType::Strength)
                    .with_category(gym.id)
                    .with_subcategory(legs.id),
                workout(ActivityType::Running),
            ],
            categories: vec![gym],
            subcategories: vec![legs],
        };
        (snapshot.encode().unwrap(), snapshot)
    }

    /// Delegates to a [`MemoryStore`] but fails the nth workout insert and,
    /// optionally, the rollback.
    struct FailingStore {
        inner: MemoryStore,
        fail_on_workout_insert: usize,
        fail_rollback: bool,
        inserts: usize,
    }

    impl LocalStore for FailingStore {
        async fn workouts(&mut self) -> Result<Vec<WorkoutRecord>, StoreError> {
            self.inner.workouts().await
        }

        async fn categories(&mut self) -> Result<Vec<Category>, StoreError> {
            self.inner.categories().await
        }

        async fn subcategories(&mut self) -> Result<Vec<Subcategory>, StoreError> {
            self.inner.subcategories().await
        }

        async fn find_workout_by_external_id(
            &mut self,
            external_id: &str,
        ) -> Result<Option<WorkoutRecord>, StoreError> {
            self.inner.find_workout_by_external_id(external_id).await
        }

        async fn insert_category(&mut self, category: &Category) -> Result<(), StoreError> {
            self.inner.insert_category(category).await
        }

        async fn insert_subcategory(
            &mut self,
            subcategory: &Subcategory,
        ) -> Result<(), StoreError> {
            self.inner.insert_subcategory(subcategory).await
        }

        async fn insert_workout(&mut self, workout: &WorkoutRecord) -> Result<(), StoreError> {
            self.inserts += 1;
            if self.inserts == self.fail_on_workout_insert {
                return Err(StoreError::Backend("disk full".to_string()));
            }
            self.inner.insert_workout(workout).await
        }

        async fn update_workout(&mut self, workout: &WorkoutRecord) -> Result<(), StoreError> {
            self.inner.update_workout(workout).await
        }

        async fn delete_workout(&mut self, id: Uuid) -> Result<(), StoreError> {
            self.inner.delete_workout(id).await
        }

        async fn delete_category(&mut self, id: Uuid) -> Result<(), StoreError> {
            self.inner.delete_category(id).await
        }

        async fn delete_subcategory(&mut self, id: Uuid) -> Result<(), StoreError> {
            self.inner.delete_subcategory(id).await
        }

        async fn delete_all(&mut self) -> Result<(), StoreError> {
            self.inner.delete_all().await
        }

        async fn commit(&mut self) -> Result<(), StoreError> {
            self.inner.commit().await
        }

        async fn rollback(&mut self) -> Result<(), StoreError> {
            if self.fail_rollback {
                return Err(StoreError::Backend("connection lost".to_string()));
            }
            self.inner.rollback().await
        }
    }

    #[tokio::test]
    async fn test_restore_replaces_dataset() {
        let mut store = seeded_store().await;
        let (bytes, snapshot) = backup();

        let summary = restore(&bytes, &mut store).await.unwrap();

        assert_eq!(summary.removed_workouts, 2);
        assert_eq!(summary.removed_categories, 1);
        assert_eq!(summary.restored_workouts, 2);
        assert_eq!(summary.restored_subcategories, 1);
        assert!(!store.has_pending_changes());
        assert_eq!(store.workouts().await.unwrap(), snapshot.workouts);
        assert_eq!(store.categories().await.unwrap(), snapshot.categories);
        assert_eq!(store.subcategories().await.unwrap(), snapshot.subcategories);
    }

    #[tokio::test]
    async fn test_restore_references_resolve() {
        let mut store = seeded_store().await;
        let (bytes, _) = backup();
        restore(&bytes, &mut store).await.unwrap();

        let categories: HashSet<Uuid> = store
            .categories()
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        let subcategories: HashSet<Uuid> = store
            .subcategories()
            .await
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();

        for workout in store.workouts().await.unwrap() {
            if let Some(id) = workout.category_id {
                assert!(categories.contains(&id));
            }
            if let Some(id) = workout.subcategory_id {
                assert!(subcategories.contains(&id));
            }
        }
    }

    #[tokio::test]
    async fn test_malformed_document_leaves_store_untouched() {
        let mut store = seeded_store().await;

        let err = restore(b"\x01\x02\x03", &mut store).await.unwrap_err();

        assert!(matches!(
            err,
            RestoreError::Document(DocumentError::MalformedDocument(_))
        ));
        assert_eq!(store.committed_counts(), (2, 1, 0));
        assert!(!store.has_pending_changes());
    }

    #[tokio::test]
    async fn test_dangling_reference_leaves_store_untouched() {
        let mut store = seeded_store().await;
        let orphan = workout(ActivityType::Yoga).with_category(Uuid::new_v4());
        let bytes = encode(&[orphan], &[], &[]).unwrap();

        let err = restore(&bytes, &mut store).await.unwrap_err();

        assert!(matches!(
            err,
            RestoreError::Document(DocumentError::MalformedSection { .. })
        ));
        assert_eq!(store.committed_counts(), (2, 1, 0));
    }

    #[tokio::test]
    async fn test_empty_document_clears_store() {
        let mut store = seeded_store().await;
        let bytes = encode(&[], &[], &[]).unwrap();

        let summary = restore(&bytes, &mut store).await.unwrap();

        assert_eq!(summary.restored_workouts, 0);
        assert_eq!(store.committed_counts(), (0, 0, 0));
    }

    #[tokio::test]
    async fn test_store_failure_rolls_back() {
        let mut store = FailingStore {
            inner: seeded_store().await,
            fail_on_workout_insert: 2,
            fail_rollback: false,
            inserts: 0,
        };
        let (bytes, _) = backup();

        let err = restore(&bytes, &mut store).await.unwrap_err();

        assert!(matches!(err, RestoreError::StoreWriteFailure(_)));
        assert_eq!(store.inner.committed_counts(), (2, 1, 0));
        assert!(!store.inner.has_pending_changes());
    }

    #[tokio::test]
    async fn test_failed_rollback_reports_partial_restore_risk() {
        let mut store = FailingStore {
            inner: seeded_store().await,
            fail_on_workout_insert: 1,
            fail_rollback: true,
            inserts: 0,
        };
        let (bytes, _) = backup();

        let err = restore(&bytes, &mut store).await.unwrap_err();

        match err {
            RestoreError::PartialRestoreRisk { write, rollback } => {
                assert!(write.to_string().contains("disk full"));
                assert!(rollback.to_string().contains("connection lost"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
