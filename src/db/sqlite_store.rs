use fitvault_core::models::timestamp;
use fitvault_core::{ActivityType, Category, LocalStore, StoreError, Subcategory, WorkoutRecord};
use sqlx::error::ErrorKind;
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

/// SQLite-backed [`LocalStore`].
///
/// The first mutation opens a transaction that stays open until `commit` or
/// `rollback`; reads made while it is open go through it and see the staged
/// rows. Dropping the store with a transaction open rolls it back.
pub struct SqliteStore {
    pool: SqlitePool,
    tx: Option<Transaction<'static, Sqlite>>,
}

#[derive(sqlx::FromRow)]
struct WorkoutRow {
    id: String,
    activity_type: String,
    duration: i64,
    date: String,
    category_id: Option<String>,
    subcategory_id: Option<String>,
    external_id: Option<String>,
    notes: Option<String>,
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: String,
    name: String,
}

#[derive(sqlx::FromRow)]
struct SubcategoryRow {
    id: String,
    name: String,
    category_id: String,
}

const SELECT_WORKOUTS: &str = "SELECT id, activity_type, duration, date, category_id, \
     subcategory_id, external_id, notes FROM workouts";

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn parse_uuid(raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Backend(format!("corrupt id '{}': {}", raw, e)))
}

fn parse_optional_uuid(raw: Option<String>) -> Result<Option<Uuid>, StoreError> {
    raw.as_deref().map(parse_uuid).transpose()
}

impl TryFrom<WorkoutRow> for WorkoutRecord {
    type Error = StoreError;

    fn try_from(row: WorkoutRow) -> Result<Self, Self::Error> {
        let activity_type: ActivityType = row.activity_type.parse().map_err(StoreError::Backend)?;
        let duration = u32::try_from(row.duration).map_err(|_| {
            StoreError::Backend(format!("corrupt duration {} for {}", row.duration, row.id))
        })?;
        Ok(WorkoutRecord {
            id: parse_uuid(&row.id)?,
            activity_type,
            duration,
            date: timestamp::parse(&row.date).map_err(StoreError::Backend)?,
            category_id: parse_optional_uuid(row.category_id)?,
            subcategory_id: parse_optional_uuid(row.subcategory_id)?,
            external_id: row.external_id,
            notes: row.notes,
        })
    }
}

impl TryFrom<CategoryRow> for Category {
    type Error = StoreError;

    fn try_from(row: CategoryRow) -> Result<Self, Self::Error> {
        Ok(Category {
            id: parse_uuid(&row.id)?,
            name: row.name,
        })
    }
}

impl TryFrom<SubcategoryRow> for Subcategory {
    type Error = StoreError;

    fn try_from(row: SubcategoryRow) -> Result<Self, Self::Error> {
        Ok(Subcategory {
            id: parse_uuid(&row.id)?,
            name: row.name,
            category_id: parse_uuid(&row.category_id)?,
        })
    }
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, tx: None }
    }

    /// Returns true while a transaction holds uncommitted writes.
    pub fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    async fn tx(&mut self) -> Result<&mut Transaction<'static, Sqlite>, StoreError> {
        if self.tx.is_none() {
            self.tx = Some(self.pool.begin().await.map_err(backend)?);
        }
        self.tx
            .as_mut()
            .ok_or_else(|| StoreError::Backend("transaction not open".to_string()))
    }

    async fn exists(&mut self, table: &'static str, id: Uuid) -> Result<bool, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE id = ?", table);
        let id = id.to_string();
        let tx = self.tx().await?;
        let (count,): (i64,) = sqlx::query_as(&sql)
            .bind(&id)
            .fetch_one(&mut **tx)
            .await
            .map_err(backend)?;
        Ok(count > 0)
    }

    async fn check_workout_references(&mut self, workout: &WorkoutRecord) -> Result<(), StoreError> {
        if let Some(category_id) = workout.category_id {
            if !self.exists("categories", category_id).await? {
                return Err(StoreError::MissingReference {
                    entity: "workout",
                    id: workout.id,
                    target: "category",
                    target_id: category_id,
                });
            }
        }
        if let Some(subcategory_id) = workout.subcategory_id {
            if !self.exists("subcategories", subcategory_id).await? {
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

    async fn delete_by_id(&mut self, table: &'static str, entity: &'static str, id: Uuid) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = ?", table);
        let id_str = id.to_string();
        let tx = self.tx().await?;
        let result = sqlx::query(&sql)
            .bind(&id_str)
            .execute(&mut **tx)
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity, id });
        }
        Ok(())
    }
}

/// Maps unique-constraint failures on workouts to [`StoreError::Duplicate`].
fn workout_write_error(e: sqlx::Error, workout: &WorkoutRecord) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.kind() == ErrorKind::UniqueViolation {
            return if db.message().contains("external_id") {
                StoreError::Duplicate {
                    entity: "external id",
                    id: workout.external_id.clone().unwrap_or_default(),
                }
            } else {
                StoreError::Duplicate {
                    entity: "workout",
                    id: workout.id.to_string(),
                }
            };
        }
    }
    backend(e)
}

fn unique_error(e: sqlx::Error, entity: &'static str, id: Uuid) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.kind() == ErrorKind::UniqueViolation => {
            StoreError::Duplicate {
                entity,
                id: id.to_string(),
            }
        }
        _ => backend(e),
    }
}

impl LocalStore for SqliteStore {
    async fn workouts(&mut self) -> Result<Vec<WorkoutRecord>, StoreError> {
        let sql = format!("{} ORDER BY rowid", SELECT_WORKOUTS);
        let query = sqlx::query_as::<_, WorkoutRow>(&sql);
        let rows = match self.tx.as_mut() {
            Some(tx) => query.fetch_all(&mut **tx).await,
            None => query.fetch_all(&self.pool).await,
        }
        .map_err(backend)?;
        rows.into_iter().map(WorkoutRecord::try_from).collect()
    }

    async fn categories(&mut self) -> Result<Vec<Category>, StoreError> {
        let query = sqlx::query_as::<_, CategoryRow>("SELECT id, name FROM categories ORDER BY rowid");
        let rows = match self.tx.as_mut() {
            Some(tx) => query.fetch_all(&mut **tx).await,
            None => query.fetch_all(&self.pool).await,
        }
        .map_err(backend)?;
        rows.into_iter().map(Category::try_from).collect()
    }

    async fn subcategories(&mut self) -> Result<Vec<Subcategory>, StoreError> {
        let query = sqlx::query_as::<_, SubcategoryRow>(
            "SELECT id, name, category_id FROM subcategories ORDER BY rowid",
        );
        let rows = match self.tx.as_mut() {
            Some(tx) => query.fetch_all(&mut **tx).await,
            None => query.fetch_all(&self.pool).await,
        }
        .map_err(backend)?;
        rows.into_iter().map(Subcategory::try_from).collect()
    }

    async fn find_workout_by_external_id(
        &mut self,
        external_id: &str,
    ) -> Result<Option<WorkoutRecord>, StoreError> {
        let sql = format!("{} WHERE external_id = ?", SELECT_WORKOUTS);
        let query = sqlx::query_as::<_, WorkoutRow>(&sql).bind(external_id);
        let row = match self.tx.as_mut() {
            Some(tx) => query.fetch_optional(&mut **tx).await,
            None => query.fetch_optional(&self.pool).await,
        }
        .map_err(backend)?;
        row.map(WorkoutRecord::try_from).transpose()
    }

    async fn insert_category(&mut self, category: &Category) -> Result<(), StoreError> {
        let id = category.id.to_string();
        let tx = self.tx().await?;
        sqlx::query("INSERT INTO categories (id, name) VALUES (?, ?)")
            .bind(&id)
            .bind(&category.name)
            .execute(&mut **tx)
            .await
            .map_err(|e| unique_error(e, "category", category.id))?;
        Ok(())
    }

    async fn insert_subcategory(&mut self, subcategory: &Subcategory) -> Result<(), StoreError> {
        if !self.exists("categories", subcategory.category_id).await? {
            return Err(StoreError::MissingReference {
                entity: "subcategory",
                id: subcategory.id,
                target: "category",
                target_id: subcategory.category_id,
            });
        }

        let id = subcategory.id.to_string();
        let category_id = subcategory.category_id.to_string();
        let tx = self.tx().await?;
        sqlx::query("INSERT INTO subcategories (id, name, category_id) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(&subcategory.name)
            .bind(&category_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| unique_error(e, "subcategory", subcategory.id))?;
        Ok(())
    }

    async fn insert_workout(&mut self, workout: &WorkoutRecord) -> Result<(), StoreError> {
        self.check_workout_references(workout).await?;

        let id = workout.id.to_string();
        let date = timestamp::format(&workout.date);
        let category_id = workout.category_id.map(|id| id.to_string());
        let subcategory_id = workout.subcategory_id.map(|id| id.to_string());
        let tx = self.tx().await?;
        sqlx::query(
            r#"
            INSERT INTO workouts (id, activity_type, duration, date, category_id, subcategory_id, external_id, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(workout.activity_type.as_str())
        .bind(i64::from(workout.duration))
        .bind(&date)
        .bind(&category_id)
        .bind(&subcategory_id)
        .bind(&workout.external_id)
        .bind(&workout.notes)
        .execute(&mut **tx)
        .await
        .map_err(|e| workout_write_error(e, workout))?;
        Ok(())
    }

    async fn update_workout(&mut self, workout: &WorkoutRecord) -> Result<(), StoreError> {
        self.check_workout_references(workout).await?;

        let id = workout.id.to_string();
        let date = timestamp::format(&workout.date);
        let category_id = workout.category_id.map(|id| id.to_string());
        let subcategory_id = workout.subcategory_id.map(|id| id.to_string());
        let tx = self.tx().await?;
        let result = sqlx::query(
            r#"
            UPDATE workouts
            SET activity_type = ?, duration = ?, date = ?, category_id = ?, subcategory_id = ?,
                external_id = ?, notes = ?
            WHERE id = ?
            "#,
        )
        .bind(workout.activity_type.as_str())
        .bind(i64::from(workout.duration))
        .bind(&date)
        .bind(&category_id)
        .bind(&subcategory_id)
        .bind(&workout.external_id)
        .bind(&workout.notes)
        .bind(&id)
        .execute(&mut **tx)
        .await
        .map_err(|e| workout_write_error(e, workout))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "workout",
                id: workout.id,
            });
        }
        Ok(())
    }

    async fn delete_workout(&mut self, id: Uuid) -> Result<(), StoreError> {
        self.delete_by_id("workouts", "workout", id).await
    }

    async fn delete_category(&mut self, id: Uuid) -> Result<(), StoreError> {
        self.delete_by_id("categories", "category", id).await
    }

    async fn delete_subcategory(&mut self, id: Uuid) -> Result<(), StoreError> {
        self.delete_by_id("subcategories", "subcategory", id).await
    }

    async fn delete_all(&mut self) -> Result<(), StoreError> {
        let tx = self.tx().await?;
        for table in ["workouts", "subcategories", "categories"] {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&mut **tx)
                .await
                .map_err(backend)?;
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await.map_err(backend)?;
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await.map_err(backend)?;
        }
        Ok(())
    }
}
