//! Workouts command for fitlevel.
//!
//! Lists an athlete's logged workouts, newest first.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::render;
use crate::core::LoggedWorkout;
use crate::engine::Ledger;
use crate::storage::AthleteStore;

/// Options for the workouts command.
#[derive(Debug, Clone)]
pub struct WorkoutsOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Maximum number of workouts to show.
    pub limit: usize,
}

impl Default for WorkoutsOptions {
    fn default() -> Self {
        Self {
            json: false,
            quiet: false,
            limit: 20,
        }
    }
}

/// One workout as listed.
#[derive(Debug, Clone, Serialize)]
pub struct WorkoutInfo {
    pub id: u64,
    pub name: String,
    /// Human-readable type, from the subtype when set.
    pub workout_type: String,
    pub duration_minutes: u32,
    pub intensity: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_miles: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pace_per_km: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pace_per_mile: Option<String>,
    /// Exercise names for strength workouts.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exercises: Vec<String>,
    /// Total weight moved (reps x kg) across weighted sets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_load_kg: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub xp_earned: u64,
    pub logged_at: DateTime<Utc>,
}

impl From<&LoggedWorkout> for WorkoutInfo {
    fn from(workout: &LoggedWorkout) -> Self {
        let record = &workout.record;
        Self {
            id: workout.id,
            name: record.name.clone(),
            workout_type: record.readable_type(),
            duration_minutes: record.duration_minutes,
            intensity: record.intensity,
            distance_km: record.distance_km,
            distance_miles: record.distance_miles(),
            pace_per_km: record.pace_per_km(),
            pace_per_mile: record.pace_per_mile(),
            exercises: record.exercises.iter().map(|e| e.name.clone()).collect(),
            total_load_kg: Some(record.exercise_volume().total_load_kg).filter(|kg| *kg > 0.0),
            notes: record.notes.clone(),
            xp_earned: workout.xp_earned,
            logged_at: workout.logged_at,
        }
    }
}

/// Output format for the workouts command.
#[derive(Debug, Clone, Serialize)]
pub struct WorkoutsOutput {
    pub success: bool,
    pub athlete_id: String,
    /// Total workouts on record (before the limit).
    pub total: usize,
    pub workouts: Vec<WorkoutInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The workouts command implementation.
pub struct WorkoutsCommand<S: AthleteStore> {
    ledger: Ledger<S>,
}

impl<S: AthleteStore> WorkoutsCommand<S> {
    /// Create a new workouts command.
    pub fn new(ledger: Ledger<S>) -> Self {
        Self { ledger }
    }

    /// Run the workouts command.
    pub fn run(&self, athlete_id: &str, options: &WorkoutsOptions) -> WorkoutsOutput {
        match self.ledger.athlete(athlete_id) {
            Ok(athlete) => {
                let mut workouts: Vec<&LoggedWorkout> = athlete.workouts.iter().collect();
                workouts.sort_by(|a, b| b.logged_at.cmp(&a.logged_at).then(b.id.cmp(&a.id)));

                WorkoutsOutput {
                    success: true,
                    total: workouts.len(),
                    workouts: workouts
                        .into_iter()
                        .take(options.limit)
                        .map(WorkoutInfo::from)
                        .collect(),
                    athlete_id: athlete.id,
                    error: None,
                }
            }
            Err(e) => WorkoutsOutput {
                success: false,
                athlete_id: String::new(),
                total: 0,
                workouts: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &WorkoutsOutput, options: &WorkoutsOptions) -> String {
        render(output, options.json, options.quiet, |o| {
            if !o.success {
                return format!(
                    "Could not list workouts: {}\n",
                    o.error.as_deref().unwrap_or("unknown error")
                );
            }
            if o.workouts.is_empty() {
                return format!("No workouts logged for {}.\n", o.athlete_id);
            }

            let mut text = format!(
                "Workouts for {} (showing {} of {}):\n\n",
                o.athlete_id,
                o.workouts.len(),
                o.total
            );
            for w in &o.workouts {
                text.push_str(&format!(
                    "  #{} {} [{}] {} min, intensity {}, +{} XP\n",
                    w.id,
                    w.logged_at.format("%Y-%m-%d"),
                    w.workout_type,
                    w.duration_minutes,
                    w.intensity,
                    w.xp_earned
                ));
                text.push_str(&format!("      {}", w.name));
                if let (Some(km), Some(pace)) = (w.distance_km, &w.pace_per_km) {
                    text.push_str(&format!(" | {:.2} km @ {}", km, pace));
                }
                if !w.exercises.is_empty() {
                    text.push_str(&format!(" | {}", w.exercises.join(", ")));
                }
                if let Some(load) = w.total_load_kg {
                    text.push_str(&format!(" | {:.0} kg moved", load));
                }
                text.push('\n');
                if let Some(notes) = &w.notes {
                    text.push_str(&format!("      {}\n", notes));
                }
            }
            text
        })
    }
}
