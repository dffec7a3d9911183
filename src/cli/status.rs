//! Status command for fitlevel.
//!
//! Shows level, rank, decay countdown and the last week of activity.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::render;
use crate::engine::{AthleteStatus, DecayState, Ledger};
use crate::storage::AthleteStore;

/// Options for the status command.
#[derive(Debug, Clone, Default)]
pub struct StatusOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the status command.
#[derive(Debug, Clone, Serialize)]
pub struct StatusOutput {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AthleteStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The status command implementation.
pub struct StatusCommand<S: AthleteStore> {
    ledger: Ledger<S>,
}

impl<S: AthleteStore> StatusCommand<S> {
    /// Create a new status command.
    pub fn new(ledger: Ledger<S>) -> Self {
        Self { ledger }
    }

    /// Run the status command.
    pub fn run(&self, athlete_id: &str) -> StatusOutput {
        self.run_at(athlete_id, Utc::now())
    }

    /// Run the status command as of `now`.
    pub fn run_at(&self, athlete_id: &str, now: DateTime<Utc>) -> StatusOutput {
        match self.ledger.status(athlete_id, now) {
            Ok(status) => StatusOutput {
                success: true,
                status: Some(status),
                error: None,
            },
            Err(e) => StatusOutput {
                success: false,
                status: None,
                error: Some(e.to_string()),
            },
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &StatusOutput, options: &StatusOptions) -> String {
        render(output, options.json, options.quiet, |o| match &o.status {
            Some(status) => format_status(status),
            None => format!(
                "Status unavailable: {}\n",
                o.error.as_deref().unwrap_or("unknown error")
            ),
        })
    }
}

fn format_status(status: &AthleteStatus) -> String {
    let snapshot = &status.snapshot;
    let mut text = format!("{} ({})\n", status.username, status.athlete_id);
    text.push_str(&format!(
        "  Level {} | {} | {} XP\n",
        snapshot.level, snapshot.rank, snapshot.xp
    ));
    text.push_str(&format!(
        "  {:.1}% through level, {} XP to level {}\n",
        snapshot.progress_percent,
        snapshot.xp_to_next_level,
        snapshot.level + 1
    ));
    if let Some(next) = snapshot.rank.next() {
        text.push_str(&format!(
            "  {} XP to {}\n",
            next.min_xp().saturating_sub(snapshot.xp),
            next
        ));
    }
    text.push_str(&format!(
        "  This week: {} workout(s), {} XP\n",
        status.weekly.workout_count, status.weekly.total_xp
    ));
    text.push_str(&format!("  {}\n", decay_line(status)));
    text
}

fn decay_line(status: &AthleteStatus) -> String {
    let decay = &status.decay;
    match (decay.state, decay.days_until_decay_starts) {
        (_, None) => "No workouts logged yet".to_string(),
        (DecayState::Active, Some(0)) => {
            "Last day of the grace period: work out today to avoid decay".to_string()
        }
        (DecayState::Active, Some(days)) => format!("Decay starts in {} day(s)", days),
        (DecayState::Decaying, Some(_)) => format!(
            "Decaying: {} XP at risk after {} day(s) without a workout",
            decay.xp_to_lose,
            decay.days_inactive.unwrap_or_default()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecayConfig;
    use crate::core::{WorkoutRecord, WorkoutType};
    use crate::storage::MemoryAthleteStore;
    use chrono::Duration;

    fn command_with_workout(days_ago: Option<i64>) -> (StatusCommand<MemoryAthleteStore>, DateTime<Utc>) {
        let now = Utc::now();
        let ledger = Ledger::new(MemoryAthleteStore::new(), DecayConfig::default());
        ledger.register("Ana", now - Duration::days(30)).unwrap();
        if let Some(days) = days_ago {
            let run = WorkoutRecord::new(WorkoutType::Cardio, "Run", 45, 10).with_distance(10.0);
            ledger
                .log_workout("ana", run, now - Duration::days(days))
                .unwrap();
        }
        (StatusCommand::new(ledger), now)
    }

    #[test]
    fn test_status_active() {
        let (cmd, now) = command_with_workout(Some(1));
        let output = cmd.run_at("ana", now);
        assert!(output.success);

        let text = cmd.format_output(&output, &StatusOptions::default());
        assert!(text.contains("Level 2 | Bronze | 450 XP"));
        assert!(text.contains("1550 XP to Silver"));
        assert!(text.contains("This week: 1 workout(s), 450 XP"));
        assert!(text.contains("Decay starts in 2 day(s)"));
    }

    #[test]
    fn test_status_decaying() {
        let (cmd, now) = command_with_workout(Some(4));
        let output = cmd.run_at("ana", now);

        let text = cmd.format_output(&output, &StatusOptions::default());
        assert!(text.contains("Decaying: 22 XP at risk after 4 day(s)"));
    }

    #[test]
    fn test_status_no_workouts() {
        let (cmd, now) = command_with_workout(None);
        let output = cmd.run_at("ana", now);

        let text = cmd.format_output(&output, &StatusOptions::default());
        assert!(text.contains("No workouts logged yet"));
    }

    #[test]
    fn test_status_unknown_athlete() {
        let (cmd, _) = command_with_workout(None);
        let output = cmd.run("ghost");

        assert!(!output.success);
        let options = StatusOptions {
            json: true,
            quiet: false,
        };
        let parsed: serde_json::Value =
            serde_json::from_str(&cmd.format_output(&output, &options)).unwrap();
        assert!(parsed.get("status").is_none());
        assert!(parsed["error"].as_str().unwrap().contains("ghost"));
    }
}
