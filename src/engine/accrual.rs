//! XP earned by a single workout.
//!
//! Formula:
//! 1. Start from [`weights::BASE_XP`] plus a type-specific bonus
//! 2. Multiply by `clamp(duration / 45, 1, 2)`
//! 3. Multiply by `1 + intensity / 20`
//! 4. Floor to an integer
//!
//! Type bonuses:
//! - Cardio: 25 XP per km
//! - Strength: 10 XP per set plus 0.25 XP per rep across all exercises,
//!   falling back to `sets * reps * 0.25` for flat legacy volume
//! - Flexibility: 1 XP per minute
//!
//! Every term is non-negative and both multipliers are at least 1, so the
//! result is never negative. Out-of-range inputs are clamped, not rejected.

use serde::{Deserialize, Serialize};

use crate::core::workout::{WorkoutRecord, WorkoutType, MAX_INTENSITY, MIN_INTENSITY};

/// Scoring constants.
pub mod weights {
    /// XP for completing any workout.
    pub const BASE_XP: f64 = 50.0;
    /// Minutes at which the duration multiplier starts growing past 1.
    pub const REFERENCE_MINUTES: f64 = 45.0;
    /// Lower bound of the duration multiplier.
    pub const MIN_DURATION_MULTIPLIER: f64 = 1.0;
    /// Upper bound of the duration multiplier.
    pub const MAX_DURATION_MULTIPLIER: f64 = 2.0;
    /// Intensity divisor: intensity 10 gives a 1.5x multiplier.
    pub const INTENSITY_DIVISOR: f64 = 20.0;
    /// Cardio bonus per kilometre.
    pub const XP_PER_KM: f64 = 25.0;
    /// Strength bonus per set.
    pub const XP_PER_SET: f64 = 10.0;
    /// Strength bonus per repetition.
    pub const XP_PER_REP: f64 = 0.25;
    /// Flexibility bonus per minute.
    pub const XP_PER_FLEX_MINUTE: f64 = 1.0;
}

/// Intermediate values of one XP computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XpBreakdown {
    pub base_xp: f64,
    pub type_bonus: f64,
    pub duration_multiplier: f64,
    pub intensity_multiplier: f64,
    pub xp_earned: u64,
}

/// XP earned by a workout.
pub fn xp_for_workout(workout: &WorkoutRecord) -> u64 {
    breakdown(workout).xp_earned
}

/// Compute XP along with the terms that produced it.
pub fn breakdown(workout: &WorkoutRecord) -> XpBreakdown {
    let type_bonus = type_bonus(workout);
    let duration_multiplier = duration_multiplier(workout.duration_minutes);
    let intensity_multiplier = intensity_multiplier(workout.intensity);

    let raw = (weights::BASE_XP + type_bonus) * duration_multiplier * intensity_multiplier;
    let xp_earned = if raw.is_finite() && raw > 0.0 {
        raw.floor() as u64
    } else {
        0
    };

    tracing::debug!(
        workout_type = %workout.workout_type,
        type_bonus,
        duration_multiplier,
        intensity_multiplier,
        xp_earned,
        "scored workout"
    );

    XpBreakdown {
        base_xp: weights::BASE_XP,
        type_bonus,
        duration_multiplier,
        intensity_multiplier,
        xp_earned,
    }
}

/// `clamp(duration / 45, 1, 2)`. A zero duration yields 1.
pub fn duration_multiplier(duration_minutes: u32) -> f64 {
    (f64::from(duration_minutes) / weights::REFERENCE_MINUTES).clamp(
        weights::MIN_DURATION_MULTIPLIER,
        weights::MAX_DURATION_MULTIPLIER,
    )
}

/// `1 + intensity / 20`, with intensity clamped into 1..=10.
pub fn intensity_multiplier(intensity: u8) -> f64 {
    let intensity = intensity.clamp(MIN_INTENSITY, MAX_INTENSITY);
    1.0 + f64::from(intensity) / weights::INTENSITY_DIVISOR
}

/// Bonus added to the base XP before multipliers.
pub fn type_bonus(workout: &WorkoutRecord) -> f64 {
    match workout.workout_type {
        WorkoutType::Cardio => {
            let distance = workout
                .distance_km
                .filter(|d| d.is_finite() && *d > 0.0)
                .unwrap_or(0.0);
            distance * weights::XP_PER_KM
        }
        WorkoutType::Strength => strength_bonus(workout),
        WorkoutType::Flexibility => {
            f64::from(workout.duration_minutes) * weights::XP_PER_FLEX_MINUTE
        }
    }
}

fn strength_bonus(workout: &WorkoutRecord) -> f64 {
    let volume = workout.exercise_volume();
    if volume.total_sets > 0 {
        return f64::from(volume.total_sets) * weights::XP_PER_SET
            + volume.total_reps as f64 * weights::XP_PER_REP;
    }

    match workout.legacy_volume {
        Some(legacy) => f64::from(legacy.sets) * f64::from(legacy.reps) * weights::XP_PER_REP,
        None => 0.0,
    }
}
