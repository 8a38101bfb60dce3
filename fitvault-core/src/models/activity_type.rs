use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Strength,
    Running,
    Cycling,
    Swimming,
    Yoga,
    Cardio,
    Other,
}

impl ActivityType {
    pub const ALL: [ActivityType; 7] = [
        ActivityType::Strength,
        ActivityType::Running,
        ActivityType::Cycling,
        ActivityType::Swimming,
        ActivityType::Yoga,
        ActivityType::Cardio,
        ActivityType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Strength => "strength",
            ActivityType::Running => "running",
            ActivityType::Cycling => "cycling",
            ActivityType::Swimming => "swimming",
            ActivityType::Yoga => "yoga",
            ActivityType::Cardio => "cardio",
            ActivityType::Other => "other",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_lowercase();
        ActivityType::ALL
            .into_iter()
            .find(|t| t.as_str() == lowered)
            .ok_or_else(|| {
                format!(
                    "Invalid activity type '{}'. Valid options: strength, running, cycling, \
                     swimming, yoga, cardio, other",
                    s
                )
            })
    }
}
