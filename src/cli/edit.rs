//! Edit command for fitlevel.
//!
//! Replaces a workout's details and rescores it.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::render;
use crate::core::WorkoutRecord;
use crate::engine::Ledger;
use crate::storage::AthleteStore;

/// Options for the edit command.
#[derive(Debug, Clone, Default)]
pub struct EditOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the edit command.
#[derive(Debug, Clone, Serialize)]
pub struct EditOutput {
    pub success: bool,
    pub athlete_id: String,
    pub workout_id: u64,
    /// XP the old version had earned.
    pub xp_reverted: u64,
    /// XP the new version earns.
    pub xp_earned: u64,
    pub level_from: u32,
    pub level: u32,
    pub total_xp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EditOutput {
    /// Net XP change.
    pub fn xp_delta(&self) -> i128 {
        i128::from(self.xp_earned) - i128::from(self.xp_reverted)
    }
}

/// The edit command implementation.
pub struct EditCommand<S: AthleteStore> {
    ledger: Ledger<S>,
}

impl<S: AthleteStore> EditCommand<S> {
    /// Create a new edit command.
    pub fn new(ledger: Ledger<S>) -> Self {
        Self { ledger }
    }

    /// Run the edit command.
    pub fn run(&self, athlete_id: &str, workout_id: u64, record: WorkoutRecord) -> EditOutput {
        self.run_at(athlete_id, workout_id, record, Utc::now())
    }

    /// Run the edit command at a given time.
    pub fn run_at(
        &self,
        athlete_id: &str,
        workout_id: u64,
        record: WorkoutRecord,
        now: DateTime<Utc>,
    ) -> EditOutput {
        match self.ledger.replace_workout(athlete_id, workout_id, record, now) {
            Ok(outcome) => EditOutput {
                success: true,
                athlete_id: outcome.athlete_id,
                workout_id,
                xp_reverted: outcome.xp_reverted,
                xp_earned: outcome.xp_earned,
                level_from: outcome.level_change.from,
                level: outcome.level_change.to,
                total_xp: outcome.snapshot.xp,
                error: None,
            },
            Err(e) => EditOutput {
                success: false,
                athlete_id: athlete_id.to_string(),
                workout_id,
                xp_reverted: 0,
                xp_earned: 0,
                level_from: 0,
                level: 0,
                total_xp: 0,
                error: Some(e.to_string()),
            },
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &EditOutput, options: &EditOptions) -> String {
        render(output, options.json, options.quiet, |o| {
            if !o.success {
                return format!(
                    "Edit failed: {}\n",
                    o.error.as_deref().unwrap_or("unknown error")
                );
            }
            let mut text = format!(
                "Updated workout #{}: {} XP -> {} XP ({:+} XP)\n",
                o.workout_id,
                o.xp_reverted,
                o.xp_earned,
                o.xp_delta()
            );
            if o.level != o.level_from {
                text.push_str(&format!("Level {} -> {}\n", o.level_from, o.level));
            }
            text
        })
    }
}
