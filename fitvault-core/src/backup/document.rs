use std::collections::{BTreeMap, HashSet};
use std::io::Cursor;

use ciborium::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_bytes::ByteBuf;
use uuid::Uuid;

use super::error::DocumentError;
use crate::models::{Category, Subcategory, WorkoutRecord};

/// Conventional file name for an exported backup.
pub const BACKUP_FILE_NAME: &str = "fitvault-backup.cbor";

pub const WORKOUTS_KEY: &str = "workouts";
pub const CATEGORIES_KEY: &str = "categories";
pub const SUBCATEGORIES_KEY: &str = "subcategories";

const SECTION_KEYS: [&str; 3] = [WORKOUTS_KEY, CATEGORIES_KEY, SUBCATEGORIES_KEY];

/// The decoded content of a portable document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub workouts: Vec<WorkoutRecord>,
    pub categories: Vec<Category>,
    pub subcategories: Vec<Subcategory>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.workouts.is_empty() && self.categories.is_empty() && self.subcategories.is_empty()
    }

    pub fn encode(&self) -> Result<Vec<u8>, DocumentError> {
        encode(&self.workouts, &self.categories, &self.subcategories)
    }

    /// Checks that ids are unique per section and that every reference held
    /// by a subcategory or workout resolves inside this snapshot.
    pub fn validate_references(&self) -> Result<(), DocumentError> {
        let category_ids = unique_ids(CATEGORIES_KEY, self.categories.iter().map(|c| c.id))?;
        let subcategory_ids =
            unique_ids(SUBCATEGORIES_KEY, self.subcategories.iter().map(|s| s.id))?;
        unique_ids(WORKOUTS_KEY, self.workouts.iter().map(|w| w.id))?;

        for sub in &self.subcategories {
            if !category_ids.contains(&sub.category_id) {
                return Err(dangling(SUBCATEGORIES_KEY, sub.id, "category", sub.category_id));
            }
        }

        let mut external_ids = HashSet::new();
        for workout in &self.workouts {
            if let Some(category_id) = workout.category_id {
                if !category_ids.contains(&category_id) {
                    return Err(dangling(WORKOUTS_KEY, workout.id, "category", category_id));
                }
            }
            if let Some(subcategory_id) = workout.subcategory_id {
                if !subcategory_ids.contains(&subcategory_id) {
                    return Err(dangling(
                        WORKOUTS_KEY,
                        workout.id,
                        "subcategory",
                        subcategory_id,
                    ));
                }
            }
            if let Some(ext) = &workout.external_id {
                if !external_ids.insert(ext.as_str()) {
                    return Err(DocumentError::MalformedSection {
                        section: WORKOUTS_KEY,
                        reason: format!("external id '{}' appears more than once", ext),
                    });
                }
            }
        }

        Ok(())
    }
}

fn unique_ids(
    section: &'static str,
    ids: impl Iterator<Item = Uuid>,
) -> Result<HashSet<Uuid>, DocumentError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(DocumentError::MalformedSection {
                section,
                reason: format!("id {} appears more than once", id),
            });
        }
    }
    Ok(seen)
}

fn dangling(section: &'static str, id: Uuid, target: &str, target_id: Uuid) -> DocumentError {
    DocumentError::MalformedSection {
        section,
        reason: format!("{} references unknown {} {}", id, target, target_id),
    }
}

/// Serializes the three entity lists into one portable document.
///
/// Each list becomes a JSON byte string; the three are then written as a CBOR
/// map keyed by section name.
pub fn encode(
    workouts: &[WorkoutRecord],
    categories: &[Category],
    subcategories: &[Subcategory],
) -> Result<Vec<u8>, DocumentError> {
    let mut sections = BTreeMap::new();
    sections.insert(WORKOUTS_KEY, encode_section(workouts)?);
    sections.insert(CATEGORIES_KEY, encode_section(categories)?);
    sections.insert(SUBCATEGORIES_KEY, encode_section(subcategories)?);

    let mut buf = Vec::new();
    ciborium::into_writer(&sections, &mut buf)
        .map_err(|e| DocumentError::Encode(e.to_string()))?;
    Ok(buf)
}

fn encode_section<T: Serialize>(items: &[T]) -> Result<ByteBuf, DocumentError> {
    serde_json::to_vec(items)
        .map(ByteBuf::from)
        .map_err(|e| DocumentError::Encode(e.to_string()))
}

/// Parses a portable document.
///
/// A missing section decodes as an empty list. Anything other than a map of
/// known section names to byte strings is [`DocumentError::MalformedDocument`];
/// a section that is not a list of its entity is
/// [`DocumentError::MalformedSection`].
pub fn decode(bytes: &[u8]) -> Result<Snapshot, DocumentError> {
    let mut cursor = Cursor::new(bytes);
    let value: Value = ciborium::from_reader(&mut cursor)
        .map_err(|e| DocumentError::MalformedDocument(e.to_string()))?;

    if cursor.position() as usize != bytes.len() {
        return Err(DocumentError::MalformedDocument(format!(
            "{} trailing bytes after document",
            bytes.len() - cursor.position() as usize
        )));
    }

    let entries = match value {
        Value::Map(entries) => entries,
        _ => {
            return Err(DocumentError::MalformedDocument(
                "expected a map of section name to bytes".to_string(),
            ))
        }
    };

    let mut sections: BTreeMap<&'static str, Vec<u8>> = BTreeMap::new();
    for (key, payload) in entries {
        let key = match key {
            Value::Text(key) => key,
            _ => {
                return Err(DocumentError::MalformedDocument(
                    "section names must be strings".to_string(),
                ))
            }
        };
        let section = SECTION_KEYS
            .into_iter()
            .find(|known| *known == key)
            .ok_or_else(|| {
                DocumentError::MalformedDocument(format!("unexpected section '{}'", key))
            })?;
        let payload = match payload {
            Value::Bytes(payload) => payload,
            _ => {
                return Err(DocumentError::MalformedDocument(format!(
                    "section '{}' is not a byte string",
                    section
                )))
            }
        };
        if sections.insert(section, payload).is_some() {
            return Err(DocumentError::MalformedDocument(format!(
                "section '{}' appears more than once",
                section
            )));
        }
    }

    Ok(Snapshot {
        workouts: decode_section(WORKOUTS_KEY, sections.remove(WORKOUTS_KEY))?,
        categories: decode_section(CATEGORIES_KEY, sections.remove(CATEGORIES_KEY))?,
        subcategories: decode_section(SUBCATEGORIES_KEY, sections.remove(SUBCATEGORIES_KEY))?,
    })
}

fn decode_section<T: DeserializeOwned>(
    section: &'static str,
    payload: Option<Vec<u8>>,
) -> Result<Vec<T>, DocumentError> {
    match payload {
        None => Ok(Vec::new()),
        Some(bytes) => {
            serde_json::from_slice(&bytes).map_err(|e| DocumentError::MalformedSection {
                section,
                reason: e.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityType;
    use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};

    fn base_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 7, 30, 0).unwrap()
    }

    fn sample() -> Snapshot {
        let gym = Category::new("Gym");
        let outdoor = Category::new("Outdoor");
        let push = Subcategory::new("Push", gym.id);
        let trail = Subcategory::new("Trail", outdoor.id);

        let workouts = vec![
            WorkoutRecord::new(ActivityType::Strength, 60, base_date())
                .with_category(gym.id)
                .with_subcategory(push.id)
                .with_notes("Bench PR"),
            WorkoutRecord::new(ActivityType::Running, 42, base_date() + Duration::days(1))
                .with_category(outdoor.id)
                .with_subcategory(trail.id),
            WorkoutRecord::new(ActivityType::Cardio, 25, base_date() + Duration::hours(5))
                .with_external_id("HK-5A0E"),
        ];

        Snapshot {
            workouts,
            categories: vec![gym, outdoor],
            subcategories: vec![push, trail],
        }
    }

    fn raw_document(entries: Vec<(&str, ciborium::Value)>) -> Vec<u8> {
        let map = ciborium::Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (ciborium::Value::Text(k.to_string()), v))
                .collect(),
        );
        let mut buf = Vec::new();
        ciborium::into_writer(&map, &mut buf).unwrap();
        buf
    }

    #[test]
    fn test_roundtrip_preserves_entities_and_order() {
        let snapshot = sample();
        let bytes = snapshot.encode().unwrap();
        let decoded = decode(&bytes).unwrap();

        assert_eq!(decoded, snapshot);
        assert_eq!(decoded.workouts[1].activity_type, ActivityType::Running);
    }

    /// Workouts spread over every activity type, several offsets and each
    /// combination of optional fields.
    fn varied() -> Snapshot {
        let swim = Category::new("Natação & água");
        let drills = Subcategory::new("Drills", swim.id);
        let offsets = [-8 * 3600, -3 * 3600 - 1800, 0, 5 * 3600 + 2700, 14 * 3600];

        let workouts = (0..14u32)
            .map(|i| {
                let offset = FixedOffset::east_opt(offsets[i as usize % offsets.len()]).unwrap();
                let local = offset
                    .with_ymd_and_hms(2024, 12, 31, (i * 5) % 24, (i * 13) % 60, i % 60)
                    .unwrap();
                let activity_type = ActivityType::ALL[i as usize % ActivityType::ALL.len()];
                let mut workout =
                    WorkoutRecord::new(activity_type, i * 17, local.with_timezone(&Utc));
                match i % 4 {
                    0 => workout = workout.with_notes(""),
                    1 => workout = workout.with_subcategory(drills.id),
                    2 => {
                        workout = workout
                            .with_category(swim.id)
                            .with_external_id(format!("ext-{}", i))
                    }
                    _ => {}
                }
                workout
            })
            .collect();

        Snapshot {
            workouts,
            categories: vec![swim],
            subcategories: vec![drills],
        }
    }

    #[test]
    fn test_roundtrip_varied_records() {
        let snapshot = varied();
        assert!(snapshot.validate_references().is_ok());

        let decoded = decode(&snapshot.encode().unwrap()).unwrap();

        assert_eq!(decoded, snapshot);
        assert_eq!(decoded.workouts[0].notes.as_deref(), Some(""));
        assert_eq!(decoded.workouts[1].category_id, None);
        assert!(decoded.workouts[1].subcategory_id.is_some());
        assert_eq!(decoded.workouts[0].duration, 0);
    }

    #[test]
    fn test_roundtrip_normalizes_offsets_to_utc() {
        let offset = FixedOffset::east_opt(-5 * 3600).unwrap();
        let local = offset.with_ymd_and_hms(2025, 3, 9, 23, 15, 0).unwrap();
        let workout = WorkoutRecord::new(ActivityType::Running, 30, local.with_timezone(&Utc));

        let decoded = decode(&encode(std::slice::from_ref(&workout), &[], &[]).unwrap()).unwrap();

        assert_eq!(
            decoded.workouts[0].date,
            Utc.with_ymd_and_hms(2025, 3, 10, 4, 15, 0).unwrap()
        );
    }

    #[test]
    fn test_roundtrip_truncates_to_seconds() {
        let mut workout = WorkoutRecord::new(ActivityType::Yoga, 15, base_date());
        workout.date = base_date() + Duration::milliseconds(420);

        let bytes = encode(std::slice::from_ref(&workout), &[], &[]).unwrap();
        let decoded = decode(&bytes).unwrap();

        assert_eq!(decoded.workouts[0].date, base_date());
        assert_eq!(decoded.workouts[0].id, workout.id);
    }

    #[test]
    fn test_empty_export_roundtrips() {
        let bytes = encode(&[], &[], &[]).unwrap();
        let decoded = decode(&bytes).unwrap();

        assert!(decoded.workouts.is_empty());
        assert!(decoded.categories.is_empty());
        assert!(decoded.subcategories.is_empty());

        let again = decoded.encode().unwrap();
        assert_eq!(decode(&again).unwrap(), decoded);
    }

    #[test]
    fn test_sections_are_json_byte_strings() {
        let bytes = encode(&[], &[Category::new("Gym")], &[]).unwrap();
        let value: ciborium::Value = ciborium::from_reader(bytes.as_slice()).unwrap();

        let entries = value.as_map().unwrap();
        assert_eq!(entries.len(), 3);
        for (key, payload) in entries {
            let key = key.as_text().unwrap();
            assert!(SECTION_KEYS.contains(&key));
            let json: serde_json::Value =
                serde_json::from_slice(payload.as_bytes().unwrap()).unwrap();
            assert!(json.is_array());
        }
    }

    #[test]
    fn test_missing_section_is_empty() {
        let snapshot = sample();
        let workouts = serde_json::to_vec(&snapshot.workouts).unwrap();
        let subcategories = serde_json::to_vec(&snapshot.subcategories).unwrap();
        let bytes = raw_document(vec![
            (WORKOUTS_KEY, ciborium::Value::Bytes(workouts)),
            (SUBCATEGORIES_KEY, ciborium::Value::Bytes(subcategories)),
        ]);

        let decoded = decode(&bytes).unwrap();
        assert!(decoded.categories.is_empty());
        assert_eq!(decoded.workouts, snapshot.workouts);
    }

    #[test]
    fn test_empty_map_decodes_to_empty_snapshot() {
        let bytes = raw_document(vec![]);
        assert!(decode(&bytes).unwrap().is_empty());
    }

    #[test]
    fn test_garbage_is_malformed_document() {
        let err = decode(b"definitely not cbor").unwrap_err();
        assert!(matches!(err, DocumentError::MalformedDocument(_)));
    }

    #[test]
    fn test_non_map_is_malformed_document() {
        let mut buf = Vec::new();
        ciborium::into_writer(&vec!["workouts"], &mut buf).unwrap();
        let err = decode(&buf).unwrap_err();
        assert!(matches!(err, DocumentError::MalformedDocument(_)));
    }

    #[test]
    fn test_text_value_is_malformed_document() {
        let bytes = raw_document(vec![(WORKOUTS_KEY, ciborium::Value::Text("[]".into()))]);
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, DocumentError::MalformedDocument(_)));
    }

    #[test]
    fn test_unknown_key_is_malformed_document() {
        let bytes = raw_document(vec![
            (WORKOUTS_KEY, ciborium::Value::Bytes(b"[]".to_vec())),
            ("settings", ciborium::Value::Bytes(b"[]".to_vec())),
        ]);
        let err = decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("settings"));
    }

    #[test]
    fn test_trailing_bytes_are_malformed_document() {
        let mut bytes = encode(&[], &[], &[]).unwrap();
        bytes.push(0x00);
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, DocumentError::MalformedDocument(_)));
    }

    #[test]
    fn test_unknown_activity_type_is_malformed_section() {
        let json = br#"[{"id":"5f0c6c1e-8f4e-4a57-9a57-6d3a4c1f2b11","type":"rowing","duration":30,"date":"2025-01-15T07:30:00+00:00"}]"#;
        let bytes = raw_document(vec![(WORKOUTS_KEY, ciborium::Value::Bytes(json.to_vec()))]);

        let err = decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            DocumentError::MalformedSection { section: WORKOUTS_KEY, .. }
        ));
    }

    #[test]
    fn test_missing_field_is_malformed_section() {
        let json = br#"[{"id":"5f0c6c1e-8f4e-4a57-9a57-6d3a4c1f2b11"}]"#;
        let bytes = raw_document(vec![(CATEGORIES_KEY, ciborium::Value::Bytes(json.to_vec()))]);

        let err = decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            DocumentError::MalformedSection { section: CATEGORIES_KEY, .. }
        ));
    }

    #[test]
    fn test_validate_accepts_sample() {
        assert!(sample().validate_references().is_ok());
    }

    #[test]
    fn test_validate_rejects_dangling_workout_category() {
        let mut snapshot = sample();
        snapshot.categories.remove(1);
        snapshot.subcategories.remove(1);

        let err = snapshot.validate_references().unwrap_err();
        assert!(matches!(
            err,
            DocumentError::MalformedSection { section: WORKOUTS_KEY, .. }
        ));
    }

    #[test]
    fn test_validate_rejects_orphan_subcategory() {
        let mut snapshot = sample();
        snapshot.workouts.clear();
        snapshot.categories.remove(0);

        let err = snapshot.validate_references().unwrap_err();
        assert!(matches!(
            err,
            DocumentError::MalformedSection { section: SUBCATEGORIES_KEY, .. }
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let mut snapshot = sample();
        let copy = snapshot.categories[0].clone();
        snapshot.categories.push(copy);

        let err = snapshot.validate_references().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_validate_rejects_repeated_external_id() {
        let mut snapshot = sample();
        let copy = WorkoutRecord::new(ActivityType::Cardio, 25, base_date())
            .with_external_id("HK-5A0E");
        snapshot.workouts.push(copy);

        let err = snapshot.validate_references().unwrap_err();
        assert!(matches!(
            err,
            DocumentError::MalformedSection { section: WORKOUTS_KEY, .. }
        ));
        assert!(err.to_string().contains("HK-5A0E"));
    }
}
