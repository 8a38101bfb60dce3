//! Numeric workout activity codes used by the platform health store, and their
//! mapping onto the local activity types.

use crate::models::ActivityType;

pub const CROSS_TRAINING: u32 = 11;
pub const CYCLING: u32 = 13;
pub const DANCE: u32 = 14;
pub const DANCE_INSPIRED_TRAINING: u32 = 15;
pub const ELLIPTICAL: u32 = 16;
pub const FUNCTIONAL_STRENGTH_TRAINING: u32 = 20;
pub const HIKING: u32 = 24;
pub const MIND_AND_BODY: u32 = 29;
pub const MIXED_METABOLIC_CARDIO_TRAINING: u32 = 30;
pub const RUNNING: u32 = 37;
pub const STAIR_CLIMBING: u32 = 44;
pub const SWIMMING: u32 = 46;
pub const TRADITIONAL_STRENGTH_TRAINING: u32 = 50;
pub const WALKING: u32 = 52;
pub const WATER_FITNESS: u32 = 53;
pub const YOGA: u32 = 57;
pub const BARRE: u32 = 58;
pub const CORE_TRAINING: u32 = 59;
pub const FLEXIBILITY: u32 = 62;
pub const HIGH_INTENSITY_INTERVAL_TRAINING: u32 = 63;
pub const JUMP_ROPE: u32 = 64;
pub const KICKBOXING: u32 = 65;
pub const PILATES: u32 = 66;
pub const STAIRS: u32 = 68;
pub const STEP_TRAINING: u32 = 69;
pub const WHEELCHAIR_RUN_PACE: u32 = 71;
pub const TAI_CHI: u32 = 72;
pub const MIXED_CARDIO: u32 = 73;
pub const HAND_CYCLING: u32 = 74;
pub const CARDIO_DANCE: u32 = 77;
pub const SOCIAL_DANCE: u32 = 78;
pub const OTHER: u32 = 3000;

/// Maps an external activity code onto a local activity type.
///
/// Several granular codes collapse onto one local type. Codes without a local
/// counterpart map to [`ActivityType::Other`].
pub fn activity_type_for_code(code: u32) -> ActivityType {
    match code {
        TRADITIONAL_STRENGTH_TRAINING | FUNCTIONAL_STRENGTH_TRAINING | CORE_TRAINING => {
            ActivityType::Strength
        }
        RUNNING | WHEELCHAIR_RUN_PACE => ActivityType::Running,
        CYCLING | HAND_CYCLING => ActivityType::Cycling,
        SWIMMING | WATER_FITNESS => ActivityType::Swimming,
        YOGA | MIND_AND_BODY | FLEXIBILITY | TAI_CHI => ActivityType::Yoga,
        BARRE
        | PILATES
        | DANCE
        | DANCE_INSPIRED_TRAINING
        | CARDIO_DANCE
        | SOCIAL_DANCE
        | WALKING
        | HIKING
        | CROSS_TRAINING
        | ELLIPTICAL
        | MIXED_METABOLIC_CARDIO_TRAINING
        | MIXED_CARDIO
        | HIGH_INTENSITY_INTERVAL_TRAINING
        | JUMP_ROPE
        | KICKBOXING
        | STAIR_CLIMBING
        | STAIRS
        | STEP_TRAINING => ActivityType::Cardio,
        _ => ActivityType::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conditioning_codes_map_to_cardio() {
        for code in [BARRE, PILATES, DANCE, SOCIAL_DANCE, CARDIO_DANCE, WALKING] {
            assert_eq!(activity_type_for_code(code), ActivityType::Cardio, "code {}", code);
        }
    }

    #[test]
    fn test_strength_variants_collapse() {
        assert_eq!(
            activity_type_for_code(TRADITIONAL_STRENGTH_TRAINING),
            ActivityType::Strength
        );
        assert_eq!(
            activity_type_for_code(FUNCTIONAL_STRENGTH_TRAINING),
            ActivityType::Strength
        );
        assert_eq!(activity_type_for_code(CORE_TRAINING), ActivityType::Strength);
    }

    #[test]
    fn test_yoga_variants_collapse() {
        for code in [YOGA, MIND_AND_BODY, FLEXIBILITY, TAI_CHI] {
            assert_eq!(activity_type_for_code(code), ActivityType::Yoga);
        }
    }

    #[test]
    fn test_direct_mappings() {
        assert_eq!(activity_type_for_code(RUNNING), ActivityType::Running);
        assert_eq!(activity_type_for_code(CYCLING), ActivityType::Cycling);
        assert_eq!(activity_type_for_code(SWIMMING), ActivityType::Swimming);
    }

    #[test]
    fn test_unrecognized_codes_map_to_other() {
        assert_eq!(activity_type_for_code(OTHER), ActivityType::Other);
        assert_eq!(activity_type_for_code(0), ActivityType::Other);
        assert_eq!(activity_type_for_code(9999), ActivityType::Other);
    }
}
