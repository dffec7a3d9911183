//! Inactivity decay.
//!
//! Decay logic:
//! 1. `days_since` = whole days since the last workout (future timestamps count as 0)
//! 2. Within the grace window the athlete is Active and loses nothing
//! 3. Past it, `multiplier = 1 - (1 - rate)^(days_since - grace)` and
//!    `xp_to_lose = floor(xp * multiplier)`
//! 4. Sweeps over every athlete are throttled to once per configured interval
//!
//! Each application is computed against the XP held at that moment, so
//! applying decay repeatedly over the same inactive stretch compounds. The
//! sweep throttle bounds how often that happens.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{LevelChange, UserProgress};
use crate::error::{FailOpen, FitError, Result};
use crate::events::{ActivityEventType, ActivityLog};
use crate::storage::AthleteStore;

/// Whether an athlete is currently losing XP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecayState {
    /// No workout yet, or still inside the grace window.
    Active,
    /// Past the grace window.
    Decaying,
}

/// Result of evaluating decay for one athlete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayAssessment {
    pub state: DecayState,
    /// XP that applying decay now would remove.
    pub xp_to_lose: u64,
    /// `grace - days_since`. Negative once decay has started; `None` when
    /// the athlete has never logged a workout.
    pub days_until_decay_starts: Option<i64>,
    /// Whole days since the last workout.
    pub days_inactive: Option<i64>,
}

impl DecayAssessment {
    fn no_workouts() -> Self {
        Self {
            state: DecayState::Active,
            xp_to_lose: 0,
            days_until_decay_starts: None,
            days_inactive: None,
        }
    }

    /// Whether applying decay now would change anything.
    pub fn is_decaying(&self) -> bool {
        self.state == DecayState::Decaying && self.xp_to_lose > 0
    }
}

/// Whole days elapsed between `last` and `now`, never negative.
pub fn days_since(last: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - last).num_days().max(0)
}

/// `1 - (1 - rate)^days_in_decay`.
///
/// The rate is clamped into `[0, 1]`; a non-finite rate disables decay.
pub fn decay_multiplier(rate_per_day: f64, days_in_decay: i64) -> f64 {
    if days_in_decay <= 0 || !rate_per_day.is_finite() {
        return 0.0;
    }
    let rate = rate_per_day.clamp(0.0, 1.0);
    let days = i32::try_from(days_in_decay).unwrap_or(i32::MAX);
    (1.0 - (1.0 - rate).powi(days)).clamp(0.0, 1.0)
}

/// Evaluate decay for an athlete at `now`. Pure; never mutates.
pub fn calculate_decay(progress: &UserProgress, now: DateTime<Utc>) -> DecayAssessment {
    let Some(last) = progress.last_workout_at else {
        return DecayAssessment::no_workouts();
    };

    let grace = i64::from(progress.decay_grace_days);
    let days = days_since(last, now);
    let countdown = grace - days;

    if days <= grace {
        return DecayAssessment {
            state: DecayState::Active,
            xp_to_lose: 0,
            days_until_decay_starts: Some(countdown),
            days_inactive: Some(days),
        };
    }

    let multiplier = decay_multiplier(progress.decay_rate_per_day, days - grace);
    let xp = progress.cumulative_xp();
    let xp_to_lose = ((xp as f64 * multiplier).floor() as u64).min(xp);

    DecayAssessment {
        state: DecayState::Decaying,
        xp_to_lose,
        days_until_decay_starts: Some(countdown),
        days_inactive: Some(days),
    }
}

/// Apply decay in place. Returns the XP removed.
///
/// The level is re-derived only when XP actually changes.
pub fn apply_decay(progress: &mut UserProgress, now: DateTime<Utc>) -> u64 {
    let assessment = calculate_decay(progress, now);
    if assessment.xp_to_lose == 0 {
        return 0;
    }

    let (removed, change) = progress.remove_xp(assessment.xp_to_lose);
    tracing::debug!(
        xp_lost = removed,
        days_inactive = assessment.days_inactive,
        level_from = change.from,
        level_to = change.to,
        "applied decay"
    );
    removed
}

/// Check whether a sweep is due.
///
/// Returns true if no sweep was recorded or the last one is at least
/// `interval_hours` old.
pub fn should_run_decay_sweep(
    last_sweep: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    interval_hours: u32,
) -> bool {
    match last_sweep {
        None => true,
        Some(last) => now - last >= Duration::hours(i64::from(interval_hours)),
    }
}

/// Decay applied to one athlete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayedAthlete {
    pub athlete_id: String,
    pub xp_lost: u64,
    pub days_inactive: i64,
    pub level_change: LevelChange,
}

/// An athlete the sweep could not process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepFailure {
    pub athlete_id: String,
    pub error: String,
}

/// Outcome of one pass over every athlete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Athletes loaded and evaluated.
    pub processed: usize,
    /// Athletes that lost XP.
    pub decayed: Vec<DecayedAthlete>,
    /// Athletes that failed to load or save.
    pub failed: Vec<SweepFailure>,
}

impl SweepReport {
    /// Total XP removed across all athletes.
    pub fn total_xp_lost(&self) -> u64 {
        self.decayed.iter().map(|d| d.xp_lost).sum()
    }
}

/// Load, decay and commit a single athlete.
///
/// Returns `None` when the athlete is not decaying. Writes nothing in that case.
pub fn decay_athlete<S: AthleteStore>(
    store: &S,
    athlete_id: &str,
    now: DateTime<Utc>,
    log: Option<&ActivityLog>,
) -> Result<Option<DecayedAthlete>> {
    let mut athlete = store
        .get(athlete_id)?
        .ok_or_else(|| FitError::athlete_not_found(athlete_id))?;

    let assessment = calculate_decay(&athlete.progress, now);
    if !assessment.is_decaying() {
        return Ok(None);
    }

    let level_before = athlete.progress.level();
    let xp_lost = apply_decay(&mut athlete.progress, now);
    let level_change = LevelChange {
        from: level_before,
        to: athlete.progress.level(),
    };
    athlete.touch(now);
    store.put(&athlete)?;

    let days_inactive = assessment.days_inactive.unwrap_or_default();
    tracing::info!(
        athlete_id = %athlete.id,
        xp_lost,
        days_inactive,
        "athlete lost XP to inactivity"
    );

    if let Some(log) = log {
        log.record(
            ActivityEventType::DecayApplied {
                athlete_id: athlete.id.clone(),
                xp_lost,
                days_inactive,
            },
            now,
        )
        .fail_open_default("Failed to record decay event");
        if let Some(event) = ActivityEventType::level_changed(&athlete.id, level_change) {
            log.record(event, now)
                .fail_open_default("Failed to record level change");
        }
    }

    Ok(Some(DecayedAthlete {
        athlete_id: athlete.id,
        xp_lost,
        days_inactive,
        level_change,
    }))
}

/// Apply decay to every stored athlete.
///
/// Each athlete is committed on its own. A failure is logged and recorded
/// in the report, and the sweep moves on to the next athlete. Only failing
/// to enumerate athletes aborts the sweep.
pub fn run_decay_sweep<S: AthleteStore>(
    store: &S,
    now: DateTime<Utc>,
    log: Option<&ActivityLog>,
) -> Result<SweepReport> {
    let mut report = SweepReport::default();

    for athlete_id in store.ids()? {
        match decay_athlete(store, &athlete_id, now, log) {
            Ok(Some(decayed)) => {
                report.processed += 1;
                report.decayed.push(decayed);
            }
            Ok(None) => report.processed += 1,
            Err(err) => {
                tracing::warn!(athlete_id = %athlete_id, error = %err, "decay sweep skipped athlete");
                report.failed.push(SweepFailure {
                    athlete_id,
                    error: err.to_string(),
                });
            }
        }
    }

    if let Some(log) = log {
        log.record(
            ActivityEventType::SweepCompleted {
                processed: report.processed,
                decayed: report.decayed.len(),
                failed: report.failed.len(),
            },
            now,
        )
        .fail_open_default("Failed to record sweep completion");
    }

    Ok(report)
}

/// An athlete close to losing XP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecayWarning {
    pub athlete_id: String,
    /// Days left in the grace window (0 means decay starts tomorrow).
    pub days_remaining: i64,
}

/// Athletes whose grace window ends within `warning_days`.
///
/// Athletes already decaying or with no workouts are not included.
/// Unreadable records are skipped with a warning.
pub fn decay_warnings<S: AthleteStore>(
    store: &S,
    now: DateTime<Utc>,
    warning_days: u32,
) -> Result<Vec<DecayWarning>> {
    let mut warnings = Vec::new();

    for athlete_id in store.ids()? {
        let athlete = match store.get(&athlete_id) {
            Ok(Some(athlete)) => athlete,
            Ok(None) => continue,
            Err(err) => {
                tracing::warn!(athlete_id = %athlete_id, error = %err, "skipping athlete in decay warnings");
                continue;
            }
        };

        let assessment = calculate_decay(&athlete.progress, now);
        if let Some(days_remaining) = assessment.days_until_decay_starts {
            if (0..=i64::from(warning_days)).contains(&days_remaining) {
                warnings.push(DecayWarning {
                    athlete_id: athlete.id,
                    days_remaining,
                });
            }
        }
    }

    Ok(warnings)
}
