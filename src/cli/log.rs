//! Log command for fitlevel.
//!
//! Scores a workout, adds its XP and reports any level change.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::render;
use crate::core::{Rank, WorkoutRecord};
use crate::engine::{breakdown, Ledger, XpBreakdown};
use crate::storage::AthleteStore;

/// Options for the log command.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the log command.
#[derive(Debug, Clone, Serialize)]
pub struct LogOutput {
    /// Whether the workout was stored.
    pub success: bool,
    pub athlete_id: String,
    pub workout_id: u64,
    /// Human-readable workout type.
    pub workout_type: String,
    pub xp_earned: u64,
    /// How the XP was computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<XpBreakdown>,
    pub level_from: u32,
    pub level: u32,
    pub rank: Option<Rank>,
    pub total_xp: u64,
    pub progress_percent: f64,
    pub xp_to_next_level: u64,
    /// Error message if logging failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LogOutput {
    /// Whether the athlete gained at least one level.
    pub fn leveled_up(&self) -> bool {
        self.level > self.level_from
    }

    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            athlete_id: String::new(),
            workout_id: 0,
            workout_type: String::new(),
            xp_earned: 0,
            breakdown: None,
            level_from: 0,
            level: 0,
            rank: None,
            total_xp: 0,
            progress_percent: 0.0,
            xp_to_next_level: 0,
            error: Some(error.into()),
        }
    }
}

/// The log command implementation.
pub struct LogCommand<S: AthleteStore> {
    ledger: Ledger<S>,
}

impl<S: AthleteStore> LogCommand<S> {
    /// Create a new log command.
    pub fn new(ledger: Ledger<S>) -> Self {
        Self { ledger }
    }

    /// Log a workout now.
    pub fn run(&self, athlete_id: &str, record: WorkoutRecord) -> LogOutput {
        self.run_at(athlete_id, record, Utc::now())
    }

    /// Log a workout at a given time.
    pub fn run_at(
        &self,
        athlete_id: &str,
        record: WorkoutRecord,
        now: DateTime<Utc>,
    ) -> LogOutput {
        let xp_breakdown = breakdown(&record);

        match self.ledger.log_workout(athlete_id, record, now) {
            Ok(outcome) => LogOutput {
                success: true,
                athlete_id: outcome.athlete_id,
                workout_id: outcome.workout.id,
                workout_type: outcome.workout.record.readable_type(),
                xp_earned: outcome.workout.xp_earned,
                breakdown: Some(xp_breakdown),
                level_from: outcome.level_change.from,
                level: outcome.level_change.to,
                rank: Some(outcome.snapshot.rank),
                total_xp: outcome.snapshot.xp,
                progress_percent: outcome.snapshot.progress_percent,
                xp_to_next_level: outcome.snapshot.xp_to_next_level,
                error: None,
            },
            Err(e) => LogOutput::failure(e.to_string()),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &LogOutput, options: &LogOptions) -> String {
        render(output, options.json, options.quiet, |o| {
            if !o.success {
                return format!(
                    "Could not log workout: {}\n",
                    o.error.as_deref().unwrap_or("unknown error")
                );
            }

            let mut text = format!(
                "Logged workout #{} ({}): +{} XP\n",
                o.workout_id, o.workout_type, o.xp_earned
            );
            if o.leveled_up() {
                text.push_str(&format!("Level up! {} -> {}\n", o.level_from, o.level));
            }
            text.push_str(&format!(
                "Level {} ({}), {} XP total, {} XP to next level\n",
                o.level,
                o.rank.map(|r| r.label()).unwrap_or("Bronze"),
                o.total_xp,
                o.xp_to_next_level
            ));
            text
        })
    }
}
