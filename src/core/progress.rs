//! Per-athlete progress state.
//!
//! [`UserProgress`] keeps `cumulative_xp` and `level` private. Every method
//! that changes XP re-derives the level through [`level_for_xp`], so the
//! stored level always matches the stored XP.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::DecayConfig;
use crate::core::leveling::{level_for_xp, LevelSnapshot};
use crate::core::workout::LoggedWorkout;
use crate::error::{FitError, Result};

/// XP, level and decay settings for one athlete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProgress {
    cumulative_xp: u64,
    level: u32,
    /// When the athlete last logged a workout.
    #[serde(default)]
    pub last_workout_at: Option<DateTime<Utc>>,
    /// Fraction of XP lost per day past the grace window, in `[0, 1)`.
    pub decay_rate_per_day: f64,
    /// Days after the last workout before decay starts.
    pub decay_grace_days: u32,
}

/// Level before and after an XP change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelChange {
    pub from: u32,
    pub to: u32,
}

impl LevelChange {
    pub fn leveled_up(&self) -> bool {
        self.to > self.from
    }

    pub fn leveled_down(&self) -> bool {
        self.to < self.from
    }

    pub fn is_unchanged(&self) -> bool {
        self.to == self.from
    }
}

impl UserProgress {
    /// Fresh progress at 0 XP, level 1.
    pub fn new(decay_rate_per_day: f64, decay_grace_days: u32) -> Self {
        Self {
            cumulative_xp: 0,
            level: 1,
            last_workout_at: None,
            decay_rate_per_day,
            decay_grace_days,
        }
    }

    /// Fresh progress seeded from configured decay defaults.
    pub fn from_config(config: &DecayConfig) -> Self {
        Self::new(config.rate_per_day, config.grace_days)
    }

    /// Progress with a given XP total, level derived.
    #[cfg(test)]
    pub(crate) fn with_xp(mut self, xp: u64) -> Self {
        self.cumulative_xp = xp;
        self.level = level_for_xp(xp);
        self
    }

    pub fn cumulative_xp(&self) -> u64 {
        self.cumulative_xp
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// Whether the stored level disagrees with the stored XP.
    ///
    /// Only possible for records written by something other than this type.
    pub fn is_level_stale(&self) -> bool {
        self.level != level_for_xp(self.cumulative_xp)
    }

    /// Re-derive the level from XP.
    pub fn relevel(&mut self) -> LevelChange {
        let from = self.level;
        self.level = level_for_xp(self.cumulative_xp);
        LevelChange {
            from,
            to: self.level,
        }
    }

    /// Add XP and re-derive the level.
    pub fn add_xp(&mut self, amount: u64) -> LevelChange {
        self.cumulative_xp = self.cumulative_xp.saturating_add(amount);
        self.relevel()
    }

    /// Remove XP (floored at 0) and re-derive the level.
    ///
    /// Returns the XP actually removed alongside the level change.
    pub fn remove_xp(&mut self, amount: u64) -> (u64, LevelChange) {
        let removed = amount.min(self.cumulative_xp);
        self.cumulative_xp -= removed;
        (removed, self.relevel())
    }

    /// Drop back to 0 XP and level 1.
    pub fn reset(&mut self) -> LevelChange {
        self.cumulative_xp = 0;
        self.relevel()
    }

    /// Record a workout at `at`, restarting the grace window.
    pub fn record_workout_at(&mut self, at: DateTime<Utc>) {
        self.last_workout_at = Some(at);
    }

    /// Display values derived from the current XP.
    pub fn snapshot(&self) -> LevelSnapshot {
        LevelSnapshot::from_xp(self.cumulative_xp)
    }
}

impl Default for UserProgress {
    fn default() -> Self {
        Self::from_config(&DecayConfig::default())
    }
}

/// Normalize a username into an athlete identifier.
///
/// Lowercases and accepts ASCII letters, digits, `-` and `_`, up to 64
/// characters.
pub fn normalize_athlete_id(username: &str) -> Result<String> {
    let id = username.trim().to_lowercase();
    if id.is_empty() {
        return Err(FitError::invalid_athlete("username is required"));
    }
    if id.len() > 64 {
        return Err(FitError::invalid_athlete(
            "username must be at most 64 characters",
        ));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(FitError::invalid_athlete(format!(
            "username '{}' may only contain letters, digits, '-' and '_'",
            username.trim()
        )));
    }
    Ok(id)
}

/// Everything persisted for one athlete.
///
/// This is the unit of storage: every ledger operation reads one record,
/// changes it, and writes it back in a single commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteRecord {
    /// Normalized identifier (see [`normalize_athlete_id`]).
    pub id: String,
    /// Username as entered.
    pub username: String,
    /// Registration time.
    pub created_at: DateTime<Utc>,
    /// XP, level and decay state.
    pub progress: UserProgress,
    /// Logged workouts, oldest first.
    #[serde(default)]
    pub workouts: Vec<LoggedWorkout>,
    /// Next workout identifier to hand out.
    #[serde(default = "first_workout_id")]
    pub next_workout_id: u64,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

fn first_workout_id() -> u64 {
    1
}

impl AthleteRecord {
    /// Create a record for a new athlete.
    pub fn new(username: &str, progress: UserProgress, now: DateTime<Utc>) -> Result<Self> {
        let id = normalize_athlete_id(username)?;
        Ok(Self {
            id,
            username: username.trim().to_string(),
            created_at: now,
            progress,
            workouts: Vec::new(),
            next_workout_id: first_workout_id(),
            updated_at: now,
        })
    }

    /// Reserve the next workout identifier.
    pub fn allocate_workout_id(&mut self) -> u64 {
        let id = self.next_workout_id;
        self.next_workout_id = self.next_workout_id.saturating_add(1);
        id
    }

    /// Find a workout by id.
    pub fn workout(&self, workout_id: u64) -> Option<&LoggedWorkout> {
        self.workouts.iter().find(|w| w.id == workout_id)
    }

    /// Remove a workout by id, returning it.
    pub fn take_workout(&mut self, workout_id: u64) -> Option<LoggedWorkout> {
        let index = self.workouts.iter().position(|w| w.id == workout_id)?;
        Some(self.workouts.remove(index))
    }

    /// Bump `updated_at`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}
