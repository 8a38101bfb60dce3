use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::codes::activity_type_for_code;
use super::error::{HealthError, TranslationError};
use super::source::{ExternalWorkout, HealthSource};
use crate::models::{timestamp, ActivityType, WorkoutRecord};
use crate::store::{LocalStore, StoreError};

/// Outcome of one import pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Records returned by the source.
    pub fetched: usize,
    /// Records new to the local store.
    pub inserted: usize,
    /// Existing records whose fields changed at the source.
    pub updated: usize,
    /// Existing records left as they were.
    pub unchanged: usize,
    /// Records that could not be translated.
    pub skipped: usize,
}

/// The local shape of an external record before it is matched.
#[derive(Debug, Clone, PartialEq)]
struct Translated {
    external_id: String,
    activity_type: ActivityType,
    duration: u32,
    date: DateTime<Utc>,
}

impl Translated {
    fn apply_to(&self, existing: &WorkoutRecord) -> WorkoutRecord {
        WorkoutRecord {
            activity_type: self.activity_type,
            duration: self.duration,
            date: self.date,
            ..existing.clone()
        }
    }

    fn into_record(self) -> WorkoutRecord {
        WorkoutRecord::new(self.activity_type, self.duration, self.date)
            .with_external_id(self.external_id)
    }
}

fn translate(record: &ExternalWorkout) -> Result<Translated, TranslationError> {
    if record.external_id.trim().is_empty() {
        return Err(TranslationError::MissingIdentifier);
    }

    let seconds = record.duration_secs;
    let minutes = (seconds / 60.0).round();
    if !seconds.is_finite() || seconds < 0.0 || minutes > u32::MAX as f64 {
        return Err(TranslationError::InvalidDuration {
            external_id: record.external_id.clone(),
            seconds,
        });
    }

    Ok(Translated {
        external_id: record.external_id.clone(),
        activity_type: activity_type_for_code(record.activity_code),
        duration: minutes as u32,
        date: timestamp::truncate(record.start),
    })
}

enum Upsert {
    Inserted,
    Updated,
    Unchanged,
}

/// Pulls workouts from a [`HealthSource`] into a [`LocalStore`].
///
/// Each record is committed on its own; a failure part-way through leaves the
/// records already processed in place. There is no cancellation: once started,
/// an import runs until the source and store calls complete.
pub struct HealthImporter<S> {
    source: S,
    progress: Option<watch::Sender<f64>>,
}

impl<S: HealthSource> HealthImporter<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            progress: None,
        }
    }

    /// Reports the fraction of fetched records processed, from 0.0 to 1.0.
    pub fn with_progress(mut self, progress: watch::Sender<f64>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn check_authorization(&self) -> Result<bool, HealthError> {
        self.source.authorization_status().await
    }

    /// Prompts for access. Denial is `Ok(false)`.
    pub async fn request_authorization(&self) -> Result<bool, HealthError> {
        let granted = self.source.request_authorization().await?;
        if granted {
            info!("Health data access granted");
        } else {
            info!("Health data access denied");
        }
        Ok(granted)
    }

    /// Upserts every external workout, keyed by external identifier.
    pub async fn import_all<L: LocalStore>(
        &self,
        store: &mut L,
    ) -> Result<ImportReport, HealthError> {
        let records = self.fetch().await?;
        let mut report = ImportReport {
            fetched: records.len(),
            ..ImportReport::default()
        };

        for (index, record) in records.iter().enumerate() {
            match translate(record) {
                Ok(translated) => match upsert(store, translated).await? {
                    Upsert::Inserted => report.inserted += 1,
                    Upsert::Updated => report.updated += 1,
                    Upsert::Unchanged => report.unchanged += 1,
                },
                Err(e) => {
                    warn!("Skipping health record: {}", e);
                    report.skipped += 1;
                }
            }
            self.report_progress(index + 1, records.len());
        }

        self.finish(&report);
        Ok(report)
    }

    /// Inserts only external workouts with no local counterpart yet.
    ///
    /// Known external identifiers are loaded once up front; records already
    /// present are counted as unchanged and never rewritten.
    pub async fn import_unimported<L: LocalStore>(
        &self,
        store: &mut L,
    ) -> Result<ImportReport, HealthError> {
        let records = self.fetch().await?;
        let mut known: HashSet<String> = store
            .workouts()
            .await?
            .into_iter()
            .filter_map(|w| w.external_id)
            .collect();

        let mut report = ImportReport {
            fetched: records.len(),
            ..ImportReport::default()
        };

        for (index, record) in records.iter().enumerate() {
            if known.contains(&record.external_id) {
                report.unchanged += 1;
            } else {
                match translate(record) {
                    Ok(translated) => {
                        let external_id = translated.external_id.clone();
                        let workout = translated.into_record();
                        commit_one(store, Write::Insert(&workout)).await?;
                        debug!(external_id = %external_id, "Inserted health workout");
                        known.insert(external_id);
                        report.inserted += 1;
                    }
                    Err(e) => {
                        warn!("Skipping health record: {}", e);
                        report.skipped += 1;
                    }
                }
            }
            self.report_progress(index + 1, records.len());
        }

        self.finish(&report);
        Ok(report)
    }

    async fn fetch(&self) -> Result<Vec<ExternalWorkout>, HealthError> {
        if !self.source.authorization_status().await? {
            return Err(HealthError::AuthorizationDenied);
        }
        self.report_progress(0, 1);
        let records = self.source.fetch_workouts().await?;
        debug!(count = records.len(), "Fetched health workouts");
        Ok(records)
    }

    fn report_progress(&self, done: usize, total: usize) {
        if let Some(progress) = &self.progress {
            let fraction = if total == 0 {
                1.0
            } else {
                done as f64 / total as f64
            };
            progress.send_replace(fraction.clamp(0.0, 1.0));
        }
    }

    fn finish(&self, report: &ImportReport) {
        self.report_progress(1, 1);
        info!(
            fetched = report.fetched,
            inserted = report.inserted,
            updated = report.updated,
            unchanged = report.unchanged,
            skipped = report.skipped,
            "Health import finished"
        );
    }
}

async fn upsert<L: LocalStore>(store: &mut L, translated: Translated) -> Result<Upsert, StoreError> {
    match store.find_workout_by_external_id(&translated.external_id).await? {
        Some(existing) => {
            let refreshed = translated.apply_to(&existing);
            if refreshed == existing {
                return Ok(Upsert::Unchanged);
            }
            commit_one(store, Write::Update(&refreshed)).await?;
            debug!(external_id = %translated.external_id, "Updated health workout");
            Ok(Upsert::Updated)
        }
        None => {
            let external_id = translated.external_id.clone();
            let workout = translated.into_record();
            commit_one(store, Write::Insert(&workout)).await?;
            debug!(external_id = %external_id, "Inserted health workout");
            Ok(Upsert::Inserted)
        }
    }
}

enum Write<'a> {
    Insert(&'a WorkoutRecord),
    Update(&'a WorkoutRecord),
}

/// Stages one write and commits it, rolling back if either step fails.
async fn commit_one<L: LocalStore>(store: &mut L, write: Write<'_>) -> Result<(), StoreError> {
    let staged = match write {
        Write::Insert(workout) => store.insert_workout(workout).await,
        Write::Update(workout) => store.update_workout(workout).await,
    };
    let result = match staged {
        Ok(()) => store.commit().await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        if let Err(rollback) = store.rollback().await {
            warn!("Rollback after failed import write also failed: {}", rollback);
        }
        return Err(e);
    }
    Ok(())
}
