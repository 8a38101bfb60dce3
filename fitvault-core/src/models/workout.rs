use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::activity_type::ActivityType;
use super::timestamp;

/// A single logged workout.
///
/// Category and subcategory are referenced by id only. `external_id` holds the
/// health-store identifier for imported records and is how re-imports are
/// recognized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub duration: u32, // minutes
    #[serde(with = "timestamp")]
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl WorkoutRecord {
    pub fn new(activity_type: ActivityType, duration: u32, date: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            activity_type,
            duration,
            date: timestamp::truncate(date),
            category_id: None,
            subcategory_id: None,
            external_id: None,
            notes: None,
        }
    }

    pub fn with_category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_subcategory(mut self, subcategory_id: Uuid) -> Self {
        self.subcategory_id = Some(subcategory_id);
        self
    }

    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn is_imported(&self) -> bool {
        self.external_id.is_some()
    }
}

impl fmt::Display for WorkoutRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({} min)",
            self.date.format("%Y-%m-%d %H:%M"),
            self.activity_type,
            self.duration
        )?;
        if let Some(notes) = &self.notes {
            write!(f, " - {}", notes)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn morning() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 7, 30, 0).unwrap()
    }

    #[test]
    fn test_workout_new() {
        let workout = WorkoutRecord::new(ActivityType::Running, 45, morning());

        assert_eq!(workout.activity_type, ActivityType::Running);
        assert_eq!(workout.duration, 45);
        assert_eq!(workout.date, morning());
        assert!(workout.category_id.is_none());
        assert!(workout.subcategory_id.is_none());
        assert!(!workout.is_imported());
    }

    #[test]
    fn test_workout_new_truncates_subseconds() {
        let date = morning() + chrono::Duration::milliseconds(750);
        let workout = WorkoutRecord::new(ActivityType::Yoga, 20, date);
        assert_eq!(workout.date, morning());
    }

    #[test]
    fn test_workout_builders() {
        let category = Uuid::new_v4();
        let subcategory = Uuid::new_v4();
        let workout = WorkoutRecord::new(ActivityType::Strength, 60, morning())
            .with_category(category)
            .with_subcategory(subcategory)
            .with_external_id("HK-1")
            .with_notes("Leg day");

        assert_eq!(workout.category_id, Some(category));
        assert_eq!(workout.subcategory_id, Some(subcategory));
        assert_eq!(workout.external_id.as_deref(), Some("HK-1"));
        assert!(workout.is_imported());
        assert_eq!(workout.notes.as_deref(), Some("Leg day"));
    }

    #[test]
    fn test_workout_json_field_names() {
        let workout = WorkoutRecord::new(ActivityType::Cycling, 90, morning());
        let json: serde_json::Value = serde_json::to_value(&workout).unwrap();

        assert_eq!(json["type"], "cycling");
        assert_eq!(json["duration"], 90);
        assert_eq!(json["date"], "2025-01-15T07:30:00+00:00");
        assert!(json.get("category_id").is_none());
    }

    #[test]
    fn test_workout_json_missing_required_field() {
        let json = r#"{"id":"5f0c6c1e-8f4e-4a57-9a57-6d3a4c1f2b11","type":"running","date":"2025-01-15T07:30:00+00:00"}"#;
        assert!(serde_json::from_str::<WorkoutRecord>(json).is_err());
    }

    #[test]
    fn test_workout_display() {
        let workout = WorkoutRecord::new(ActivityType::Swimming, 30, morning()).with_notes("Pool");
        let output = format!("{}", workout);
        assert!(output.contains("2025-01-15 07:30"));
        assert!(output.contains("swimming"));
        assert!(output.contains("30 min"));
        assert!(output.contains("Pool"));
    }
}
