//! Group challenges: a time-boxed goal that athletes join and race toward.
//!
//! A [`Challenge`] is persisted with its participant list. Progress is never
//! stored; it is measured from each participant's logged workouts whenever
//! standings are taken. The first time a participant reaches the target the
//! moment is stamped on their [`Participant`] entry and kept, even if a
//! workout is later deleted.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::workout::{LoggedWorkout, WorkoutRecord, WorkoutType};
use crate::error::{FitError, Result};

/// What a challenge counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeGoal {
    /// Total distance in kilometres.
    Distance,
    /// Number of workouts.
    Workouts,
}

impl ChallengeGoal {
    /// Parse a goal name (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "distance" => Some(Self::Distance),
            "workouts" => Some(Self::Workouts),
            _ => None,
        }
    }

    /// Unit label for display.
    pub fn unit(self) -> &'static str {
        match self {
            Self::Distance => "km",
            Self::Workouts => "workouts",
        }
    }
}

/// Which workouts a challenge counts.
///
/// Serialized as its label: `cardio`, `strength`, `flexibility`, or a
/// subtype such as `strength_push`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WorkoutFilter {
    /// Every workout of a broad type.
    Type(WorkoutType),
    /// Workouts carrying this subtype label. The prefix before the first
    /// `_` names the broad type, which must match too.
    Subtype {
        workout_type: WorkoutType,
        label: String,
    },
}

impl WorkoutFilter {
    /// Parse a type name or a `<type>_<detail>` subtype label.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        if let Some(workout_type) = WorkoutType::parse(&value) {
            return Some(Self::Type(workout_type));
        }

        let (prefix, detail) = value.split_once('_')?;
        if detail.is_empty() {
            return None;
        }
        let workout_type = WorkoutType::parse(prefix)?;
        Some(Self::Subtype {
            workout_type,
            label: value,
        })
    }

    /// Whether a workout counts toward the challenge.
    pub fn matches(&self, record: &WorkoutRecord) -> bool {
        match self {
            Self::Type(workout_type) => record.workout_type == *workout_type,
            Self::Subtype {
                workout_type,
                label,
            } => {
                record.workout_type == *workout_type
                    && record
                        .subtype
                        .as_deref()
                        .is_some_and(|s| s.trim().eq_ignore_ascii_case(label))
            }
        }
    }

    /// The label as written by the user.
    pub fn label(&self) -> &str {
        match self {
            Self::Type(workout_type) => workout_type.as_str(),
            Self::Subtype { label, .. } => label,
        }
    }
}

impl fmt::Display for WorkoutFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<WorkoutFilter> for String {
    fn from(filter: WorkoutFilter) -> Self {
        filter.label().to_string()
    }
}

impl TryFrom<String> for WorkoutFilter {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("unknown workout filter '{}'", value))
    }
}

/// An athlete taking part in a challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub athlete_id: String,
    pub joined_at: DateTime<Utc>,
    /// When the target was first reached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// A time-boxed goal shared by its participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: u64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Athlete who created the challenge. Always a participant.
    pub creator_id: String,
    pub goal: ChallengeGoal,
    /// Target value in the goal's unit.
    pub target: f64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Only count matching workouts, if set.
    #[serde(rename = "workout_type", default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<WorkoutFilter>,
    #[serde(default)]
    pub participants: Vec<Participant>,
    pub created_at: DateTime<Utc>,
}

impl Challenge {
    /// Check the definition before it is stored.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(FitError::invalid_challenge("title is required"));
        }
        if !self.target.is_finite() || self.target <= 0.0 {
            return Err(FitError::invalid_challenge(format!(
                "target must be a positive number, got {}",
                self.target
            )));
        }
        if self.end <= self.start {
            return Err(FitError::invalid_challenge("end must be after start"));
        }
        Ok(())
    }

    /// Participant entry for an athlete.
    pub fn participant(&self, athlete_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.athlete_id == athlete_id)
    }

    /// Whether the window has closed.
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        now > self.end
    }

    /// Add an athlete. Rejected when already joined or after the end.
    pub fn join(&mut self, athlete_id: &str, now: DateTime<Utc>) -> Result<()> {
        if self.participant(athlete_id).is_some() {
            return Err(FitError::invalid_challenge(format!(
                "{} already joined challenge {}",
                athlete_id, self.id
            )));
        }
        if self.has_ended(now) {
            return Err(FitError::invalid_challenge(format!(
                "challenge {} has ended",
                self.id
            )));
        }

        self.participants.push(Participant {
            athlete_id: athlete_id.to_string(),
            joined_at: now,
            completed_at: None,
        });
        Ok(())
    }

    /// Remove an athlete. The creator cannot leave.
    pub fn leave(&mut self, athlete_id: &str) -> Result<Participant> {
        if athlete_id == self.creator_id {
            return Err(FitError::invalid_challenge(
                "the creator cannot leave their own challenge",
            ));
        }
        let position = self
            .participants
            .iter()
            .position(|p| p.athlete_id == athlete_id)
            .ok_or_else(|| {
                FitError::invalid_challenge(format!(
                    "{} is not in challenge {}",
                    athlete_id, self.id
                ))
            })?;
        Ok(self.participants.remove(position))
    }

    /// Stamp completion for a participant who has reached the target.
    ///
    /// Returns true when a new stamp was written.
    pub fn mark_completed(
        &mut self,
        athlete_id: &str,
        progress: &ChallengeProgress,
        now: DateTime<Utc>,
    ) -> bool {
        if !progress.completed {
            return false;
        }
        match self
            .participants
            .iter_mut()
            .find(|p| p.athlete_id == athlete_id)
        {
            Some(participant) if participant.completed_at.is_none() => {
                participant.completed_at = Some(now);
                true
            }
            _ => false,
        }
    }

    /// Whether a workout falls inside the window and passes the filter.
    ///
    /// The window is inclusive on both ends.
    pub fn counts(&self, workout: &LoggedWorkout) -> bool {
        workout.logged_at >= self.start
            && workout.logged_at <= self.end
            && self
                .filter
                .as_ref()
                .is_none_or(|f| f.matches(&workout.record))
    }
}

/// How far an athlete is through a challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeProgress {
    /// Accumulated value in the goal's unit.
    pub current: f64,
    /// Percent of target reached. Not capped, so overachievement shows.
    pub percent: f64,
    pub completed: bool,
    /// Workouts that counted.
    pub workouts: usize,
}

/// Measure progress over the workouts that count toward the challenge.
///
/// A non-positive or non-finite target yields 0% and never completes.
pub fn challenge_progress(challenge: &Challenge, workouts: &[LoggedWorkout]) -> ChallengeProgress {
    let counted: Vec<&LoggedWorkout> = workouts.iter().filter(|w| challenge.counts(w)).collect();

    let current: f64 = counted
        .iter()
        .map(|w| match challenge.goal {
            ChallengeGoal::Distance => w
                .record
                .distance_km
                .filter(|d| d.is_finite() && *d > 0.0)
                .unwrap_or(0.0),
            ChallengeGoal::Workouts => 1.0,
        })
        .sum();

    let target_valid = challenge.target.is_finite() && challenge.target > 0.0;
    let percent = if target_valid {
        current / challenge.target * 100.0
    } else {
        0.0
    };

    ChallengeProgress {
        current,
        percent,
        completed: target_valid && percent >= 100.0,
        workouts: counted.len(),
    }
}
