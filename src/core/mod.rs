//! Core types and logic for fitlevel.
//!
//! This module contains the leveling curve, workout records, per-athlete
//! progress state, and challenge goals.

pub mod challenge;
pub mod leveling;
pub mod progress;
pub mod workout;

pub use challenge::{
    challenge_progress, Challenge, ChallengeGoal, ChallengeProgress, Participant, WorkoutFilter,
};
pub use leveling::{
    level_cost, level_for_xp, level_progress_percent, rank_for_xp, xp_required_for_next_level,
    xp_to_reach_level, LevelCurve, LevelSnapshot, Rank,
};
pub use progress::{normalize_athlete_id, AthleteRecord, LevelChange, UserProgress};
pub use workout::{
    Exercise, ExerciseSet, ExerciseVolume, LegacyVolume, LoggedWorkout, WorkoutRecord,
    WorkoutType,
};
