//! Clear command for fitlevel.
//!
//! Removes every workout and resets the athlete to level 1.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::render;
use crate::engine::Ledger;
use crate::storage::AthleteStore;

/// Options for the clear command.
#[derive(Debug, Clone, Default)]
pub struct ClearOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Confirm the reset. Nothing is changed without it.
    pub yes: bool,
}

/// Output format for the clear command.
#[derive(Debug, Clone, Serialize)]
pub struct ClearOutput {
    pub success: bool,
    pub athlete_id: String,
    pub workouts_removed: usize,
    pub xp_reverted: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ClearOutput {
    fn failure(athlete_id: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            athlete_id: athlete_id.to_string(),
            workouts_removed: 0,
            xp_reverted: 0,
            error: Some(error.into()),
        }
    }
}

/// The clear command implementation.
pub struct ClearCommand<S: AthleteStore> {
    ledger: Ledger<S>,
}

impl<S: AthleteStore> ClearCommand<S> {
    /// Create a new clear command.
    pub fn new(ledger: Ledger<S>) -> Self {
        Self { ledger }
    }

    /// Run the clear command.
    pub fn run(&self, athlete_id: &str, options: &ClearOptions) -> ClearOutput {
        self.run_at(athlete_id, options, Utc::now())
    }

    /// Run the clear command at a given time.
    pub fn run_at(&self, athlete_id: &str, options: &ClearOptions, now: DateTime<Utc>) -> ClearOutput {
        if !options.yes {
            return ClearOutput::failure(
                athlete_id,
                "refusing to clear workouts without --yes",
            );
        }

        match self.ledger.clear_workouts(athlete_id, now) {
            Ok(outcome) => ClearOutput {
                success: true,
                athlete_id: outcome.athlete_id,
                workouts_removed: outcome.workouts_removed,
                xp_reverted: outcome.xp_reverted,
                error: None,
            },
            Err(e) => ClearOutput::failure(athlete_id, e.to_string()),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ClearOutput, options: &ClearOptions) -> String {
        render(output, options.json, options.quiet, |o| {
            if o.success {
                format!(
                    "Cleared {} workout(s) for {} ({} XP removed). Back to level 1.\n",
                    o.workouts_removed, o.athlete_id, o.xp_reverted
                )
            } else {
                format!(
                    "Clear failed: {}\n",
                    o.error.as_deref().unwrap_or("unknown error")
                )
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecayConfig;
    use crate::core::{WorkoutRecord, WorkoutType};
    use crate::storage::MemoryAthleteStore;

    fn command() -> ClearCommand<MemoryAthleteStore> {
        let ledger = Ledger::new(MemoryAthleteStore::new(), DecayConfig::default());
        ledger.register("ana", Utc::now()).unwrap();
        ledger
            .log_workout(
                "ana",
                WorkoutRecord::new(WorkoutType::Flexibility, "Yoga", 30, 5),
                Utc::now(),
            )
            .unwrap();
        ClearCommand::new(ledger)
    }

    #[test]
    fn test_clear_requires_confirmation() {
        let cmd = command();
        let output = cmd.run("ana", &ClearOptions::default());

        assert!(!output.success);
        assert!(output.error.unwrap().contains("--yes"));
    }

    #[test]
    fn test_clear_confirmed() {
        let cmd = command();
        let options = ClearOptions {
            yes: true,
            ..Default::default()
        };
        let output = cmd.run("ana", &options);

        assert!(output.success);
        assert_eq!(output.workouts_removed, 1);
        assert_eq!(output.xp_reverted, 100);
        assert!(cmd
            .format_output(&output, &options)
            .contains("Cleared 1 workout(s)"));
    }
}
