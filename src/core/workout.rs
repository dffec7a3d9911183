//! Workout records as supplied to the scoring engine.
//!
//! A [`WorkoutRecord`] is a plain value object. Once XP has been computed
//! from it the record is stored alongside the XP it earned and never edited
//! in place; see `engine::ledger` for how replacements are applied.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FitError, Result};

/// Kilometres to miles.
pub const KM_TO_MILES: f64 = 0.621371;

/// Intensity bounds on the 1-10 scale.
pub const MIN_INTENSITY: u8 = 1;
pub const MAX_INTENSITY: u8 = 10;

/// Broad kind of workout. Drives the type-specific XP bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutType {
    Cardio,
    Strength,
    Flexibility,
}

impl WorkoutType {
    /// Parse a workout type name (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "cardio" => Some(Self::Cardio),
            "strength" => Some(Self::Strength),
            "flexibility" => Some(Self::Flexibility),
            _ => None,
        }
    }

    /// Lowercase identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cardio => "cardio",
            Self::Strength => "strength",
            Self::Flexibility => "flexibility",
        }
    }

    /// Display name used when no subtype is set.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Cardio => "Cardio",
            Self::Strength => "Strength Training",
            Self::Flexibility => "Flexibility",
        }
    }
}

impl fmt::Display for WorkoutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single set of a strength exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSet {
    /// Repetitions performed.
    pub reps: u32,
    /// Load in kilograms, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
}

/// A named strength exercise with its sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    /// Exercise name (e.g., "Bench Press").
    pub name: String,
    /// Sets performed.
    #[serde(default)]
    pub sets: Vec<ExerciseSet>,
}

/// Flat sets x reps volume recorded by older clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyVolume {
    pub sets: u32,
    pub reps: u32,
}

/// Aggregate strength volume across all exercises.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ExerciseVolume {
    /// Number of sets across all exercises.
    pub total_sets: u32,
    /// Repetitions across all sets.
    pub total_reps: u64,
    /// Sum of reps x weight across all weighted sets.
    pub total_load_kg: f64,
}

/// One completed workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    /// Workout kind.
    #[serde(rename = "type")]
    pub workout_type: WorkoutType,
    /// Finer label such as `cardio_running` or `strength_push`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    /// Free-form name.
    pub name: String,
    /// Duration in minutes.
    pub duration_minutes: u32,
    /// Perceived intensity, 1-10.
    pub intensity: u8,
    /// Distance in kilometres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    /// Strength exercises with their sets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exercises: Vec<Exercise>,
    /// Older flat sets/reps volume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_volume: Option<LegacyVolume>,
    /// Notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl WorkoutRecord {
    /// Create a workout with no distance, exercises or notes.
    pub fn new(
        workout_type: WorkoutType,
        name: impl Into<String>,
        duration_minutes: u32,
        intensity: u8,
    ) -> Self {
        Self {
            workout_type,
            subtype: None,
            name: name.into(),
            duration_minutes,
            intensity,
            distance_km: None,
            exercises: Vec::new(),
            legacy_volume: None,
            notes: None,
        }
    }

    /// Set the distance in kilometres.
    pub fn with_distance(mut self, distance_km: f64) -> Self {
        self.distance_km = Some(distance_km);
        self
    }

    /// Set the subtype label.
    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    /// Add a strength exercise.
    pub fn with_exercise(mut self, exercise: Exercise) -> Self {
        self.exercises.push(exercise);
        self
    }

    /// Set the legacy sets/reps volume.
    pub fn with_legacy_volume(mut self, sets: u32, reps: u32) -> Self {
        self.legacy_volume = Some(LegacyVolume { sets, reps });
        self
    }

    /// Set notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Check the record before it is scored.
    ///
    /// The scoring engine clamps rather than fails, so this is where bad
    /// input is turned away.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(FitError::invalid_workout("workout name is required"));
        }
        if self.duration_minutes == 0 {
            return Err(FitError::invalid_workout(
                "duration must be greater than 0",
            ));
        }
        if !(MIN_INTENSITY..=MAX_INTENSITY).contains(&self.intensity) {
            return Err(FitError::invalid_workout(format!(
                "intensity must be between {} and {}, got {}",
                MIN_INTENSITY, MAX_INTENSITY, self.intensity
            )));
        }
        if let Some(distance) = self.distance_km {
            if !distance.is_finite() || distance < 0.0 {
                return Err(FitError::invalid_workout(format!(
                    "distance must be a non-negative number, got {}",
                    distance
                )));
            }
        }
        for exercise in &self.exercises {
            if exercise.name.trim().is_empty() {
                return Err(FitError::invalid_workout("exercise name is required"));
            }
        }
        Ok(())
    }

    /// Sum sets, reps and load across all exercises.
    pub fn exercise_volume(&self) -> ExerciseVolume {
        let mut volume = ExerciseVolume::default();
        for set in self.exercises.iter().flat_map(|e| e.sets.iter()) {
            volume.total_sets = volume.total_sets.saturating_add(1);
            volume.total_reps = volume.total_reps.saturating_add(u64::from(set.reps));
            if let Some(weight) = set.weight_kg.filter(|w| w.is_finite() && *w > 0.0) {
                volume.total_load_kg += weight * f64::from(set.reps);
            }
        }
        volume
    }

    /// Distance in miles, if a positive distance was recorded.
    pub fn distance_miles(&self) -> Option<f64> {
        self.distance_km
            .filter(|d| *d > 0.0)
            .map(|d| d * KM_TO_MILES)
    }

    /// Cardio pace formatted as `m:ss /km`.
    pub fn pace_per_km(&self) -> Option<String> {
        let distance = self.cardio_distance()?;
        Some(format!("{} /km", format_pace(self.duration_minutes as f64 / distance)))
    }

    /// Cardio pace formatted as `m:ss /mi`.
    pub fn pace_per_mile(&self) -> Option<String> {
        self.cardio_distance()?;
        let miles = self.distance_miles()?;
        Some(format!("{} /mi", format_pace(self.duration_minutes as f64 / miles)))
    }

    fn cardio_distance(&self) -> Option<f64> {
        if self.workout_type != WorkoutType::Cardio || self.duration_minutes == 0 {
            return None;
        }
        self.distance_km.filter(|d| d.is_finite() && *d > 0.0)
    }

    /// Human-readable type, preferring the subtype label.
    pub fn readable_type(&self) -> String {
        if let Some(subtype) = self.subtype.as_deref() {
            if let Some(name) = subtype_display_name(subtype) {
                return name.to_string();
            }
        }
        self.workout_type.display_name().to_string()
    }
}

/// Format fractional minutes as `m:ss`.
fn format_pace(minutes: f64) -> String {
    let whole = minutes.trunc();
    let seconds = ((minutes - whole) * 60.0).trunc();
    format!("{}:{:02}", whole as u64, seconds as u64)
}

fn subtype_display_name(subtype: &str) -> Option<&'static str> {
    let name = match subtype {
        "cardio_running" => "Running",
        "cardio_walking" => "Walking",
        "cardio_cycling" => "Cycling",
        "cardio_swimming" => "Swimming",
        "cardio_hiit" => "HIIT",
        "cardio_other" => "Cardio",
        "strength_upper" => "Upper Body",
        "strength_lower" => "Lower Body",
        "strength_push" => "Push Workout",
        "strength_pull" => "Pull Workout",
        "strength_full" => "Full Body",
        "strength_other" => "Strength Training",
        "flexibility_yoga" => "Yoga",
        "flexibility_stretching" => "Stretching",
        "flexibility_other" => "Flexibility",
        _ => return None,
    };
    Some(name)
}

/// A scored workout as stored on an athlete record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedWorkout {
    /// Identifier, unique per athlete.
    pub id: u64,
    /// The workout as submitted.
    pub record: WorkoutRecord,
    /// XP awarded when the workout was logged. Source of truth for reversal.
    pub xp_earned: u64,
    /// When the workout was logged.
    pub logged_at: DateTime<Utc>,
}
