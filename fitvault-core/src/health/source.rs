use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::HealthError;

/// A workout as reported by the external health store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalWorkout {
    pub external_id: String,
    pub activity_code: u32,
    pub start: DateTime<Utc>,
    pub duration_secs: f64,
}

impl ExternalWorkout {
    pub fn new(
        external_id: impl Into<String>,
        activity_code: u32,
        start: DateTime<Utc>,
        duration_secs: f64,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            activity_code,
            start,
            duration_secs,
        }
    }
}

/// The external health store, as seen by the importer.
///
/// Authorization calls may suspend while the user answers a permission
/// prompt. A denied request is reported as `Ok(false)`, not as an error.
pub trait HealthSource: Send + Sync {
    /// Whether read access is currently granted.
    fn authorization_status(&self) -> impl Future<Output = Result<bool, HealthError>> + Send;

    /// Asks the user for read access and returns the outcome.
    fn request_authorization(&self) -> impl Future<Output = Result<bool, HealthError>> + Send;

    /// Every workout-like record in the store.
    fn fetch_workouts(
        &self,
    ) -> impl Future<Output = Result<Vec<ExternalWorkout>, HealthError>> + Send;
}
