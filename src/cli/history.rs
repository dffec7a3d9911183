//! History command for fitlevel.
//!
//! Shows an athlete's recorded activity, newest first.

use serde::Serialize;

use crate::cli::render;
use crate::engine::Ledger;
use crate::error::{FitError, Result};
use crate::events::{ActivityEvent, ActivityEventType};
use crate::storage::AthleteStore;

/// Options for the history command.
#[derive(Debug, Clone)]
pub struct HistoryOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Maximum number of events to show.
    pub limit: usize,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            json: false,
            quiet: false,
            limit: 20,
        }
    }
}

/// One activity entry as listed.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub event: String,
    pub details: String,
}

impl From<&ActivityEvent> for HistoryEntry {
    fn from(event: &ActivityEvent) -> Self {
        Self {
            timestamp: event.ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            event: event.data.event_name().to_string(),
            details: describe(&event.data),
        }
    }
}

fn describe(data: &ActivityEventType) -> String {
    match data {
        ActivityEventType::Registered { .. } => "registered".to_string(),
        ActivityEventType::WorkoutLogged {
            workout_id,
            workout_type,
            xp_earned,
            ..
        } => format!(
            "logged {} workout #{} (+{} XP)",
            workout_type.as_str(),
            workout_id,
            xp_earned
        ),
        ActivityEventType::WorkoutRemoved {
            workout_id,
            xp_reverted,
            ..
        } => format!("deleted workout #{} (-{} XP)", workout_id, xp_reverted),
        ActivityEventType::WorkoutReplaced {
            workout_id,
            xp_reverted,
            xp_earned,
            ..
        } => format!(
            "edited workout #{} (-{} XP, +{} XP)",
            workout_id, xp_reverted, xp_earned
        ),
        ActivityEventType::WorkoutsCleared {
            workouts_removed,
            xp_reverted,
            ..
        } => format!(
            "cleared {} workouts (-{} XP)",
            workouts_removed, xp_reverted
        ),
        ActivityEventType::LevelChanged { from, to, .. } => {
            format!("level {} -> {}", from, to)
        }
        ActivityEventType::DecayApplied {
            xp_lost,
            days_inactive,
            ..
        } => format!(
            "lost {} XP after {} days without a workout",
            xp_lost, days_inactive
        ),
        ActivityEventType::ChallengeCreated { challenge_id, .. } => {
            format!("created challenge #{}", challenge_id)
        }
        ActivityEventType::ChallengeJoined { challenge_id, .. } => {
            format!("joined challenge #{}", challenge_id)
        }
        ActivityEventType::ChallengeLeft { challenge_id, .. } => {
            format!("left challenge #{}", challenge_id)
        }
        ActivityEventType::ChallengeCompleted { challenge_id, .. } => {
            format!("completed challenge #{}", challenge_id)
        }
        ActivityEventType::SweepCompleted {
            processed, decayed, ..
        } => format!("decay sweep: {} of {} athletes decayed", decayed, processed),
    }
}

/// Output format for the history command.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryOutput {
    pub success: bool,
    pub athlete_id: String,
    /// Events on record for the athlete (before the limit).
    pub total: usize,
    pub events: Vec<HistoryEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HistoryOutput {
    fn failure(athlete_id: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            athlete_id: athlete_id.to_string(),
            total: 0,
            events: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// The history command implementation.
pub struct HistoryCommand<S: AthleteStore> {
    ledger: Ledger<S>,
}

impl<S: AthleteStore> HistoryCommand<S> {
    /// Create a new history command.
    pub fn new(ledger: Ledger<S>) -> Self {
        Self { ledger }
    }

    /// Run the history command.
    pub fn run(&self, athlete_id: &str, options: &HistoryOptions) -> HistoryOutput {
        match self.load(athlete_id) {
            Ok((id, events)) => HistoryOutput {
                success: true,
                athlete_id: id,
                total: events.len(),
                events: events
                    .iter()
                    .rev()
                    .take(options.limit)
                    .map(HistoryEntry::from)
                    .collect(),
                error: None,
            },
            Err(e) => HistoryOutput::failure(athlete_id, e.to_string()),
        }
    }

    fn load(&self, athlete_id: &str) -> Result<(String, Vec<ActivityEvent>)> {
        let athlete = self.ledger.athlete(athlete_id)?;
        let log = self
            .ledger
            .activity_log()
            .ok_or_else(|| FitError::config("no activity log configured"))?;
        let events = log.read_for_athlete(&athlete.id)?;
        Ok((athlete.id, events))
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &HistoryOutput, options: &HistoryOptions) -> String {
        render(output, options.json, options.quiet, |o| {
            if !o.success {
                return format!(
                    "History unavailable: {}\n",
                    o.error.as_deref().unwrap_or("unknown error")
                );
            }
            if o.events.is_empty() {
                return format!("No activity for {}\n", o.athlete_id);
            }

            let mut out = format!(
                "Activity for {} ({} of {})\n",
                o.athlete_id,
                o.events.len(),
                o.total
            );
            for entry in &o.events {
                out.push_str(&format!("[{}] {}\n", entry.timestamp, entry.details));
            }
            out
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecayConfig;
    use crate::core::{WorkoutRecord, WorkoutType};
    use crate::events::ActivityLog;
    use crate::storage::MemoryAthleteStore;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;

    fn ledger(dir: &TempDir) -> Ledger<MemoryAthleteStore> {
        let start = Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap();
        let ledger = Ledger::new(MemoryAthleteStore::new(), DecayConfig::default())
            .with_activity_log(ActivityLog::new(dir.path().join("activity.log")));
        ledger.register("ana", start).unwrap();
        ledger.register("max", start).unwrap();
        ledger
            .log_workout(
                "ana",
                WorkoutRecord::new(WorkoutType::Cardio, "10k", 45, 10).with_distance(10.0),
                start + Duration::hours(1),
            )
            .unwrap();
        ledger.delete_workout("ana", 1, start + Duration::hours(2)).unwrap();
        ledger
    }

    #[test]
    fn test_history_newest_first() {
        let dir = TempDir::new().unwrap();
        let cmd = HistoryCommand::new(ledger(&dir));

        let output = cmd.run("ANA", &HistoryOptions::default());
        assert!(output.success);
        assert_eq!(output.athlete_id, "ana");

        let events: Vec<&str> = output.events.iter().map(|e| e.event.as_str()).collect();
        assert_eq!(
            events,
            vec![
                "level_changed",
                "workout_removed",
                "level_changed",
                "workout_logged",
                "registered"
            ]
        );
        assert_eq!(output.events[3].details, "logged cardio workout #1 (+450 XP)");

        let text = cmd.format_output(&output, &HistoryOptions::default());
        assert!(text.starts_with("Activity for ana (5 of 5)\n"));
        assert!(text.contains("[2026-10-01 10:00:00] level 2 -> 1\n"));
        assert!(text.contains("[2026-10-01 10:00:00] deleted workout #1 (-450 XP)\n"));
    }

    #[test]
    fn test_history_limit() {
        let dir = TempDir::new().unwrap();
        let cmd = HistoryCommand::new(ledger(&dir));
        let options = HistoryOptions {
            limit: 2,
            ..Default::default()
        };

        let output = cmd.run("ana", &options);
        assert_eq!(output.total, 5);
        assert_eq!(output.events.len(), 2);
    }

    #[test]
    fn test_history_unknown_athlete_or_no_log() {
        let dir = TempDir::new().unwrap();
        let cmd = HistoryCommand::new(ledger(&dir));
        assert!(!cmd.run("ghost", &HistoryOptions::default()).success);

        let bare = Ledger::new(MemoryAthleteStore::new(), DecayConfig::default());
        bare.register("ana", Utc::now()).unwrap();
        let output = HistoryCommand::new(bare).run("ana", &HistoryOptions::default());
        assert!(!output.success);
        assert!(output.error.unwrap().contains("no activity log"));
    }

    #[test]
    fn test_history_empty_for_quiet_athlete() {
        let dir = TempDir::new().unwrap();
        let cmd = HistoryCommand::new(ledger(&dir));
        let output = cmd.run("max", &HistoryOptions::default());

        assert_eq!(output.total, 1);
        let json: serde_json::Value = serde_json::from_str(&cmd.format_output(
            &output,
            &HistoryOptions {
                json: true,
                ..Default::default()
            },
        ))
        .unwrap();
        assert_eq!(json["events"][0]["event"], "registered");
    }
}
