//! Apply-and-persist layer over the scoring engine.
//!
//! Every operation loads one athlete record, changes it through the engine,
//! and commits it with a single `put`. Activity-log writes happen after the
//! commit and fail open.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::DecayConfig;
use crate::core::{
    normalize_athlete_id, AthleteRecord, LevelChange, LevelSnapshot, LoggedWorkout,
    UserProgress, WorkoutRecord,
};
use crate::engine::accrual::xp_for_workout;
use crate::engine::decay::{
    calculate_decay, decay_athlete, run_decay_sweep, DecayAssessment, DecayedAthlete,
    SweepFailure, SweepReport,
};
use crate::engine::summary::{weekly_summary, WeeklySummary};
use crate::error::{FailOpen, FitError, Result};
use crate::events::{ActivityEventType, ActivityLog};
use crate::storage::AthleteStore;

/// Result of logging a workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutOutcome {
    pub athlete_id: String,
    pub workout: LoggedWorkout,
    pub level_change: LevelChange,
    pub snapshot: LevelSnapshot,
}

/// Result of deleting a workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovalOutcome {
    pub athlete_id: String,
    pub workout: LoggedWorkout,
    /// XP actually subtracted (may be less than `xp_earned` after decay).
    pub xp_reverted: u64,
    pub level_change: LevelChange,
    pub snapshot: LevelSnapshot,
}

/// Result of editing a workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaceOutcome {
    pub athlete_id: String,
    /// The workout as stored after the edit.
    pub workout: LoggedWorkout,
    pub xp_reverted: u64,
    pub xp_earned: u64,
    pub level_change: LevelChange,
    pub snapshot: LevelSnapshot,
}

/// Result of clearing every workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearOutcome {
    pub athlete_id: String,
    pub workouts_removed: usize,
    pub xp_reverted: u64,
    pub level_change: LevelChange,
}

/// A stored level that disagreed with stored XP and was rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepairedLevel {
    pub athlete_id: String,
    pub level_change: LevelChange,
}

/// Outcome of re-deriving every stored level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelevelReport {
    pub checked: usize,
    pub repaired: Vec<RepairedLevel>,
    pub failed: Vec<SweepFailure>,
}

/// Everything shown for one athlete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteStatus {
    pub athlete_id: String,
    pub username: String,
    pub snapshot: LevelSnapshot,
    pub decay: DecayAssessment,
    pub weekly: WeeklySummary,
    pub workout_count: usize,
    pub last_workout_at: Option<DateTime<Utc>>,
}

/// Workout ledger backed by an [`AthleteStore`].
#[derive(Debug)]
pub struct Ledger<S: AthleteStore> {
    store: S,
    decay: DecayConfig,
    log: Option<ActivityLog>,
}

impl<S: AthleteStore> Ledger<S> {
    /// Create a ledger. New athletes get `decay` as their decay settings.
    pub fn new(store: S, decay: DecayConfig) -> Self {
        Self {
            store,
            decay,
            log: None,
        }
    }

    /// Record every change in `log`.
    pub fn with_activity_log(mut self, log: ActivityLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn activity_log(&self) -> Option<&ActivityLog> {
        self.log.as_ref()
    }

    /// Register a new athlete.
    pub fn register(&self, username: &str, now: DateTime<Utc>) -> Result<AthleteRecord> {
        let id = normalize_athlete_id(username)?;
        if self.store.exists(&id)? {
            return Err(FitError::athlete_exists(id));
        }

        let athlete = AthleteRecord::new(username, UserProgress::from_config(&self.decay), now)?;
        self.store.put(&athlete)?;

        tracing::info!(athlete_id = %athlete.id, "registered athlete");
        self.record(
            ActivityEventType::Registered {
                athlete_id: athlete.id.clone(),
            },
            now,
        );

        Ok(athlete)
    }

    /// Load an athlete by username or id.
    pub fn athlete(&self, athlete_id: &str) -> Result<AthleteRecord> {
        let id = normalize_athlete_id(athlete_id)?;
        self.store
            .get(&id)?
            .ok_or_else(|| FitError::athlete_not_found(id))
    }

    /// Score and store a workout.
    ///
    /// Persists the workout, adds its XP, re-derives the level, and restarts
    /// the grace window, all in one commit.
    pub fn log_workout(
        &self,
        athlete_id: &str,
        record: WorkoutRecord,
        now: DateTime<Utc>,
    ) -> Result<WorkoutOutcome> {
        record.validate()?;
        let mut athlete = self.athlete(athlete_id)?;

        let xp_earned = xp_for_workout(&record);
        let workout = LoggedWorkout {
            id: athlete.allocate_workout_id(),
            record,
            xp_earned,
            logged_at: now,
        };
        athlete.workouts.push(workout.clone());
        let level_change = athlete.progress.add_xp(xp_earned);
        athlete.progress.record_workout_at(now);
        athlete.touch(now);

        self.store.put(&athlete)?;

        tracing::debug!(
            athlete_id = %athlete.id,
            workout_id = workout.id,
            xp_earned,
            "logged workout"
        );
        self.record(
            ActivityEventType::WorkoutLogged {
                athlete_id: athlete.id.clone(),
                workout_id: workout.id,
                workout_type: workout.record.workout_type,
                xp_earned,
            },
            now,
        );
        self.record_level_change(&athlete.id, level_change, now);

        Ok(WorkoutOutcome {
            athlete_id: athlete.id,
            workout,
            level_change,
            snapshot: athlete.progress.snapshot(),
        })
    }

    /// Delete a workout and subtract the XP it earned.
    ///
    /// The stored `xp_earned` is reverted, floored at zero. The grace window
    /// is left alone.
    pub fn delete_workout(
        &self,
        athlete_id: &str,
        workout_id: u64,
        now: DateTime<Utc>,
    ) -> Result<RemovalOutcome> {
        let mut athlete = self.athlete(athlete_id)?;
        let workout = athlete
            .take_workout(workout_id)
            .ok_or_else(|| FitError::workout_not_found(&athlete.id, workout_id))?;

        let (xp_reverted, level_change) = athlete.progress.remove_xp(workout.xp_earned);
        athlete.touch(now);

        self.store.put(&athlete)?;

        self.record(
            ActivityEventType::WorkoutRemoved {
                athlete_id: athlete.id.clone(),
                workout_id,
                xp_reverted,
            },
            now,
        );
        self.record_level_change(&athlete.id, level_change, now);

        Ok(RemovalOutcome {
            athlete_id: athlete.id,
            workout,
            xp_reverted,
            level_change,
            snapshot: athlete.progress.snapshot(),
        })
    }

    /// Replace a workout's details and rescore it.
    ///
    /// The old stored XP is reverted and the new XP applied in the same
    /// commit. The workout keeps its id and original log time.
    pub fn replace_workout(
        &self,
        athlete_id: &str,
        workout_id: u64,
        record: WorkoutRecord,
        now: DateTime<Utc>,
    ) -> Result<ReplaceOutcome> {
        record.validate()?;
        let mut athlete = self.athlete(athlete_id)?;

        let level_before = athlete.progress.level();
        let xp_earned = xp_for_workout(&record);
        let position = athlete
            .workouts
            .iter()
            .position(|w| w.id == workout_id)
            .ok_or_else(|| FitError::workout_not_found(&athlete.id, workout_id))?;

        let previous_xp = athlete.workouts[position].xp_earned;
        let (xp_reverted, _) = athlete.progress.remove_xp(previous_xp);
        athlete.progress.add_xp(xp_earned);

        let workout = &mut athlete.workouts[position];
        workout.record = record;
        workout.xp_earned = xp_earned;
        let workout = workout.clone();

        let level_change = LevelChange {
            from: level_before,
            to: athlete.progress.level(),
        };
        athlete.touch(now);

        self.store.put(&athlete)?;

        self.record(
            ActivityEventType::WorkoutReplaced {
                athlete_id: athlete.id.clone(),
                workout_id,
                xp_reverted,
                xp_earned,
            },
            now,
        );
        self.record_level_change(&athlete.id, level_change, now);

        Ok(ReplaceOutcome {
            athlete_id: athlete.id,
            workout,
            xp_reverted,
            xp_earned,
            level_change,
            snapshot: athlete.progress.snapshot(),
        })
    }

    /// Remove every workout and reset the athlete to 0 XP, level 1.
    pub fn clear_workouts(&self, athlete_id: &str, now: DateTime<Utc>) -> Result<ClearOutcome> {
        let mut athlete = self.athlete(athlete_id)?;

        let workouts_removed = athlete.workouts.len();
        let xp_reverted = athlete.progress.cumulative_xp();
        athlete.workouts.clear();
        let level_change = athlete.progress.reset();
        athlete.progress.last_workout_at = None;
        athlete.touch(now);

        self.store.put(&athlete)?;

        tracing::info!(athlete_id = %athlete.id, workouts_removed, "cleared workouts");
        self.record(
            ActivityEventType::WorkoutsCleared {
                athlete_id: athlete.id.clone(),
                workouts_removed,
                xp_reverted,
            },
            now,
        );
        self.record_level_change(&athlete.id, level_change, now);

        Ok(ClearOutcome {
            athlete_id: athlete.id,
            workouts_removed,
            xp_reverted,
            level_change,
        })
    }

    /// Apply inactivity decay to one athlete.
    pub fn apply_decay(
        &self,
        athlete_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<DecayedAthlete>> {
        let id = normalize_athlete_id(athlete_id)?;
        decay_athlete(&self.store, &id, now, self.log.as_ref())
    }

    /// Apply inactivity decay to every athlete.
    pub fn run_decay_sweep(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        run_decay_sweep(&self.store, now, self.log.as_ref())
    }

    /// Re-derive every stored level from stored XP, rewriting stale records.
    pub fn relevel_all(&self, now: DateTime<Utc>) -> Result<RelevelReport> {
        let mut report = RelevelReport::default();

        for athlete_id in self.store.ids()? {
            match self.relevel_one(&athlete_id, now) {
                Ok(repaired) => {
                    report.checked += 1;
                    report.repaired.extend(repaired);
                }
                Err(err) => {
                    tracing::warn!(athlete_id = %athlete_id, error = %err, "relevel skipped athlete");
                    report.failed.push(SweepFailure {
                        athlete_id,
                        error: err.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    fn relevel_one(&self, athlete_id: &str, now: DateTime<Utc>) -> Result<Option<RepairedLevel>> {
        let mut athlete = self
            .store
            .get(athlete_id)?
            .ok_or_else(|| FitError::athlete_not_found(athlete_id))?;

        if !athlete.progress.is_level_stale() {
            return Ok(None);
        }

        let level_change = athlete.progress.relevel();
        athlete.touch(now);
        self.store.put(&athlete)?;

        tracing::info!(
            athlete_id = %athlete.id,
            from = level_change.from,
            to = level_change.to,
            "repaired stale level"
        );
        self.record_level_change(&athlete.id, level_change, now);

        Ok(Some(RepairedLevel {
            athlete_id: athlete.id,
            level_change,
        }))
    }

    /// Level, decay state and weekly summary for one athlete.
    pub fn status(&self, athlete_id: &str, now: DateTime<Utc>) -> Result<AthleteStatus> {
        let athlete = self.athlete(athlete_id)?;

        Ok(AthleteStatus {
            snapshot: athlete.progress.snapshot(),
            decay: calculate_decay(&athlete.progress, now),
            weekly: weekly_summary(&athlete.workouts, now),
            workout_count: athlete.workouts.len(),
            last_workout_at: athlete.progress.last_workout_at,
            athlete_id: athlete.id,
            username: athlete.username,
        })
    }

    fn record(&self, data: ActivityEventType, now: DateTime<Utc>) {
        if let Some(log) = &self.log {
            log.record(data, now)
                .fail_open_default("Failed to write activity log");
        }
    }

    fn record_level_change(&self, athlete_id: &str, change: LevelChange, now: DateTime<Utc>) {
        if let Some(event) = ActivityEventType::level_changed(athlete_id, change) {
            if change.leveled_up() {
                tracing::info!(athlete_id, from = change.from, to = change.to, "level up");
            }
            self.record(event, now);
        }
    }
}
