//! Activity event types and the JSONL log writer.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{LevelChange, WorkoutType};
use crate::error::{FitError, Result};

/// Schema version for activity events.
///
/// Increment when the event schema changes in a breaking way.
pub const ACTIVITY_SCHEMA_VERSION: u8 = 1;

/// One line of the activity log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityEvent {
    /// Schema version for forward compatibility.
    pub v: u8,
    /// When the event happened.
    pub ts: DateTime<Utc>,
    /// The event type and its data.
    #[serde(flatten)]
    pub data: ActivityEventType,
}

impl ActivityEvent {
    /// Create an event with an explicit timestamp.
    pub fn at(data: ActivityEventType, ts: DateTime<Utc>) -> Self {
        Self {
            v: ACTIVITY_SCHEMA_VERSION,
            ts,
            data,
        }
    }
}

/// The kind of activity and its data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ActivityEventType {
    /// A new athlete was registered.
    Registered { athlete_id: String },

    /// A workout was logged and scored.
    WorkoutLogged {
        athlete_id: String,
        workout_id: u64,
        workout_type: WorkoutType,
        xp_earned: u64,
    },

    /// A workout was deleted and its XP reverted.
    WorkoutRemoved {
        athlete_id: String,
        workout_id: u64,
        xp_reverted: u64,
    },

    /// A workout was edited and rescored.
    WorkoutReplaced {
        athlete_id: String,
        workout_id: u64,
        xp_reverted: u64,
        xp_earned: u64,
    },

    /// All workouts were removed and progress reset.
    WorkoutsCleared {
        athlete_id: String,
        workouts_removed: usize,
        xp_reverted: u64,
    },

    /// The athlete's level changed.
    LevelChanged { athlete_id: String, from: u32, to: u32 },

    /// Inactivity decay removed XP.
    DecayApplied {
        athlete_id: String,
        xp_lost: u64,
        days_inactive: i64,
    },

    /// An athlete created a challenge.
    ChallengeCreated {
        athlete_id: String,
        challenge_id: u64,
    },

    /// An athlete joined a challenge.
    ChallengeJoined {
        athlete_id: String,
        challenge_id: u64,
    },

    /// An athlete left a challenge.
    ChallengeLeft {
        athlete_id: String,
        challenge_id: u64,
    },

    /// An athlete reached a challenge target.
    ChallengeCompleted {
        athlete_id: String,
        challenge_id: u64,
    },

    /// A decay sweep over all athletes finished.
    SweepCompleted {
        processed: usize,
        decayed: usize,
        failed: usize,
    },
}

impl ActivityEventType {
    /// Level change event, or `None` when the level did not move.
    pub fn level_changed(athlete_id: impl Into<String>, change: LevelChange) -> Option<Self> {
        if change.is_unchanged() {
            return None;
        }
        Some(Self::LevelChanged {
            athlete_id: athlete_id.into(),
            from: change.from,
            to: change.to,
        })
    }

    /// Event name as written to the log.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Registered { .. } => "registered",
            Self::WorkoutLogged { .. } => "workout_logged",
            Self::WorkoutRemoved { .. } => "workout_removed",
            Self::WorkoutReplaced { .. } => "workout_replaced",
            Self::WorkoutsCleared { .. } => "workouts_cleared",
            Self::LevelChanged { .. } => "level_changed",
            Self::DecayApplied { .. } => "decay_applied",
            Self::ChallengeCreated { .. } => "challenge_created",
            Self::ChallengeJoined { .. } => "challenge_joined",
            Self::ChallengeLeft { .. } => "challenge_left",
            Self::ChallengeCompleted { .. } => "challenge_completed",
            Self::SweepCompleted { .. } => "sweep_completed",
        }
    }

    /// Athlete the event belongs to. Sweep summaries have none.
    pub fn athlete_id(&self) -> Option<&str> {
        match self {
            Self::Registered { athlete_id }
            | Self::WorkoutLogged { athlete_id, .. }
            | Self::WorkoutRemoved { athlete_id, .. }
            | Self::WorkoutReplaced { athlete_id, .. }
            | Self::WorkoutsCleared { athlete_id, .. }
            | Self::LevelChanged { athlete_id, .. }
            | Self::DecayApplied { athlete_id, .. }
            | Self::ChallengeCreated { athlete_id, .. }
            | Self::ChallengeJoined { athlete_id, .. }
            | Self::ChallengeLeft { athlete_id, .. }
            | Self::ChallengeCompleted { athlete_id, .. } => Some(athlete_id),
            Self::SweepCompleted { .. } => None,
        }
    }
}

/// Appends events to the activity log in JSONL format.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    path: PathBuf,
}

impl ActivityLog {
    /// Create a log writer for the given path. Nothing is created until the
    /// first append.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Append an event to the log.
    pub fn append(&self, event: &ActivityEvent) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| FitError::storage(parent, e))?;
        }

        let json = serde_json::to_string(event)
            .map_err(|e| FitError::serde(format!("Failed to serialize activity event: {}", e)))?;

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| FitError::storage(&self.path, e))?;

        // A cut-short append leaves no trailing newline; start a fresh line
        // so this event is not glued onto the fragment.
        let mut line = String::with_capacity(json.len() + 2);
        if ends_mid_line(&mut file).map_err(|e| FitError::storage(&self.path, e))? {
            line.push('\n');
        }
        line.push_str(&json);
        line.push('\n');

        file.write_all(line.as_bytes())
            .map_err(|e| FitError::storage(&self.path, e))?;

        Ok(())
    }

    /// Append an event of the given type stamped at `ts`.
    pub fn record(&self, data: ActivityEventType, ts: DateTime<Utc>) -> Result<()> {
        self.append(&ActivityEvent::at(data, ts))
    }

    /// Read all events from the log, oldest first.
    ///
    /// Malformed lines are skipped with a warning: an append cut short
    /// leaves a partial line that must not hide the events around it. Only
    /// I/O failures are errors.
    pub fn read_all(&self) -> Result<Vec<ActivityEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| FitError::storage(&self.path, e))?;

        let mut events = Vec::new();
        for (line_num, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<ActivityEvent>(line) {
                Ok(event) => events.push(event),
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    line = line_num + 1,
                    error = %e,
                    "skipping malformed activity event"
                ),
            }
        }

        Ok(events)
    }

    /// Events for one athlete, oldest first. Malformed lines are skipped.
    pub fn read_for_athlete(&self, athlete_id: &str) -> Result<Vec<ActivityEvent>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|e| e.data.athlete_id() == Some(athlete_id))
            .collect())
    }

    /// Timestamp of the most recent completed sweep.
    ///
    /// Drives the sweep throttle. Malformed lines are skipped so a single
    /// damaged entry cannot hide earlier sweeps.
    pub fn last_sweep_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|e| matches!(e.data, ActivityEventType::SweepCompleted { .. }))
            .map(|e| e.ts)
            .max())
    }

    /// Path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn ends_mid_line(file: &mut File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn create_test_log() -> (ActivityLog, TempDir) {
        let dir = TempDir::new().unwrap();
        let log = ActivityLog::new(dir.path().join("activity.log"));
        (log, dir)
    }

    fn logged(athlete_id: &str, workout_id: u64) -> ActivityEventType {
        ActivityEventType::WorkoutLogged {
            athlete_id: athlete_id.to_string(),
            workout_id,
            workout_type: WorkoutType::Cardio,
            xp_earned: 450,
        }
    }

    #[test]
    fn test_event_serialization_shape() {
        let ts = DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let event = ActivityEvent::at(logged("ana", 1), ts);

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"v\":1"));
        assert!(json.contains("\"event\":\"workout_logged\""));
        assert!(json.contains("\"workout_type\":\"cardio\""));
        assert!(json.contains("\"xp_earned\":450"));

        let parsed: ActivityEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_level_changed_skips_unchanged() {
        assert!(ActivityEventType::level_changed("ana", LevelChange { from: 2, to: 2 }).is_none());

        let event = ActivityEventType::level_changed("ana", LevelChange { from: 2, to: 3 }).unwrap();
        assert_eq!(event.event_name(), "level_changed");
        assert_eq!(event.athlete_id(), Some("ana"));
    }

    #[test]
    fn test_append_and_read_all() {
        let (log, _dir) = create_test_log();

        log.record(logged("ana", 1), Utc::now()).unwrap();
        log.record(
            ActivityEventType::DecayApplied {
                athlete_id: "ana".to_string(),
                xp_lost: 50,
                days_inactive: 4,
            },
            Utc::now(),
        )
        .unwrap();

        let events = log.read_all().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data.event_name(), "workout_logged");
        assert_eq!(events[1].data.event_name(), "decay_applied");
    }

    #[test]
    fn test_append_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let log = ActivityLog::new(dir.path().join("nested").join("activity.log"));

        log.record(logged("ana", 1), Utc::now()).unwrap();
        assert!(log.path().exists());
    }

    #[test]
    fn test_read_missing_log() {
        let (log, _dir) = create_test_log();
        assert!(log.read_all().unwrap().is_empty());
        assert!(log.last_sweep_at().unwrap().is_none());
    }

    #[test]
    fn test_read_skips_bad_line() {
        let (log, _dir) = create_test_log();
        log.record(logged("ana", 1), Utc::now()).unwrap();
        fs::write(
            log.path(),
            format!("{}\nnot json\n", fs::read_to_string(log.path()).unwrap().trim()),
        )
        .unwrap();

        let events = log.read_all().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data.event_name(), "workout_logged");
    }

    #[test]
    fn test_last_sweep_at_survives_truncated_line() {
        let (log, _dir) = create_test_log();
        let now = Utc::now();
        log.record(
            ActivityEventType::SweepCompleted {
                processed: 1,
                decayed: 1,
                failed: 0,
            },
            now,
        )
        .unwrap();

        // Interrupted append
        let mut file = OpenOptions::new().append(true).open(log.path()).unwrap();
        write!(file, "{{\"v\":1,\"ts\":").unwrap();
        drop(file);
        log.record(logged("ana", 1), now + Duration::minutes(1)).unwrap();

        assert_eq!(log.read_all().unwrap().len(), 2);
        assert_eq!(log.last_sweep_at().unwrap(), Some(now));
        assert_eq!(log.read_for_athlete("ana").unwrap().len(), 1);
    }

    #[test]
    fn test_unreadable_log_is_error() {
        let dir = TempDir::new().unwrap();
        // A directory where the log file should be
        let log = ActivityLog::new(dir.path());

        assert!(log.last_sweep_at().is_err());
    }

    #[test]
    fn test_read_for_athlete() {
        let (log, _dir) = create_test_log();
        log.record(logged("ana", 1), Utc::now()).unwrap();
        log.record(logged("max", 1), Utc::now()).unwrap();
        log.record(
            ActivityEventType::SweepCompleted {
                processed: 2,
                decayed: 0,
                failed: 0,
            },
            Utc::now(),
        )
        .unwrap();

        let events = log.read_for_athlete("ana").unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_last_sweep_at_is_latest() {
        let (log, _dir) = create_test_log();
        let now = Utc::now();
        let sweep = ActivityEventType::SweepCompleted {
            processed: 1,
            decayed: 0,
            failed: 0,
        };

        log.record(sweep.clone(), now - Duration::hours(30)).unwrap();
        log.record(sweep, now - Duration::hours(2)).unwrap();
        log.record(logged("ana", 1), now).unwrap();

        assert_eq!(log.last_sweep_at().unwrap(), Some(now - Duration::hours(2)));
    }
}
