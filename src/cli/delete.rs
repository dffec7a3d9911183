//! Delete command for fitlevel.
//!
//! Removes a workout and reverts the XP it earned.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::render;
use crate::engine::Ledger;
use crate::storage::AthleteStore;

/// Options for the delete command.
#[derive(Debug, Clone, Default)]
pub struct DeleteOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the delete command.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteOutput {
    pub success: bool,
    pub athlete_id: String,
    pub workout_id: u64,
    /// XP subtracted from the athlete.
    pub xp_reverted: u64,
    pub level_from: u32,
    pub level: u32,
    pub total_xp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The delete command implementation.
pub struct DeleteCommand<S: AthleteStore> {
    ledger: Ledger<S>,
}

impl<S: AthleteStore> DeleteCommand<S> {
    /// Create a new delete command.
    pub fn new(ledger: Ledger<S>) -> Self {
        Self { ledger }
    }

    /// Run the delete command.
    pub fn run(&self, athlete_id: &str, workout_id: u64) -> DeleteOutput {
        self.run_at(athlete_id, workout_id, Utc::now())
    }

    /// Run the delete command at a given time.
    pub fn run_at(
        &self,
        athlete_id: &str,
        workout_id: u64,
        now: DateTime<Utc>,
    ) -> DeleteOutput {
        match self.ledger.delete_workout(athlete_id, workout_id, now) {
            Ok(outcome) => DeleteOutput {
                success: true,
                athlete_id: outcome.athlete_id,
                workout_id,
                xp_reverted: outcome.xp_reverted,
                level_from: outcome.level_change.from,
                level: outcome.level_change.to,
                total_xp: outcome.snapshot.xp,
                error: None,
            },
            Err(e) => DeleteOutput {
                success: false,
                athlete_id: athlete_id.to_string(),
                workout_id,
                xp_reverted: 0,
                level_from: 0,
                level: 0,
                total_xp: 0,
                error: Some(e.to_string()),
            },
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &DeleteOutput, options: &DeleteOptions) -> String {
        render(output, options.json, options.quiet, |o| {
            if !o.success {
                return format!(
                    "Delete failed: {}\n",
                    o.error.as_deref().unwrap_or("unknown error")
                );
            }
            let mut text = format!(
                "Deleted workout #{}: -{} XP ({} XP total)\n",
                o.workout_id, o.xp_reverted, o.total_xp
            );
            if o.level < o.level_from {
                text.push_str(&format!("Level {} -> {}\n", o.level_from, o.level));
            }
            text
        })
    }
}
