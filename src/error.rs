//! Unified error types for fitlevel.
//!
//! The scoring engine itself is total and never returns errors. Errors only
//! arise at the edges: persistence, configuration, and input validation
//! performed before a workout reaches the engine. Infrastructure failures
//! that must not break a user-facing action (activity log writes, config
//! loading) go through [`FailOpen`].

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for fitlevel operations.
#[derive(Error, Debug)]
pub enum FitError {
    /// I/O errors from athlete record or log file operations.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON or TOML serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },

    /// A workout failed validation before scoring.
    #[error("invalid workout: {message}")]
    InvalidWorkout { message: String },

    /// An athlete identifier or username failed validation.
    #[error("invalid athlete: {message}")]
    InvalidAthlete { message: String },

    /// Athlete not found in storage.
    #[error("athlete not found: {athlete_id}")]
    AthleteNotFound { athlete_id: String },

    /// An athlete with this identifier is already registered.
    #[error("athlete already exists: {athlete_id}")]
    AthleteExists { athlete_id: String },

    /// Workout not found on the athlete record.
    #[error("workout {workout_id} not found for athlete {athlete_id}")]
    WorkoutNotFound { athlete_id: String, workout_id: u64 },

    /// Challenge not found in storage.
    #[error("challenge not found: {challenge_id}")]
    ChallengeNotFound { challenge_id: u64 },

    /// A challenge definition or membership change was rejected.
    #[error("invalid challenge: {message}")]
    InvalidChallenge { message: String },
}

/// A specialized Result type for fitlevel operations.
pub type Result<T> = std::result::Result<T, FitError>;

impl FitError {
    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid workout error.
    pub fn invalid_workout(message: impl Into<String>) -> Self {
        Self::InvalidWorkout {
            message: message.into(),
        }
    }

    /// Create an invalid athlete error.
    pub fn invalid_athlete(message: impl Into<String>) -> Self {
        Self::InvalidAthlete {
            message: message.into(),
        }
    }

    /// Create an athlete not found error.
    pub fn athlete_not_found(athlete_id: impl Into<String>) -> Self {
        Self::AthleteNotFound {
            athlete_id: athlete_id.into(),
        }
    }

    /// Create an athlete exists error.
    pub fn athlete_exists(athlete_id: impl Into<String>) -> Self {
        Self::AthleteExists {
            athlete_id: athlete_id.into(),
        }
    }

    /// Create a workout not found error.
    pub fn workout_not_found(athlete_id: impl Into<String>, workout_id: u64) -> Self {
        Self::WorkoutNotFound {
            athlete_id: athlete_id.into(),
            workout_id,
        }
    }

    /// Create a challenge not found error.
    pub fn challenge_not_found(challenge_id: u64) -> Self {
        Self::ChallengeNotFound { challenge_id }
    }

    /// Create an invalid challenge error.
    pub fn invalid_challenge(message: impl Into<String>) -> Self {
        Self::InvalidChallenge {
            message: message.into(),
        }
    }
}

impl From<io::Error> for FitError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for FitError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Trait for fail-open error handling.
///
/// Logs the error as a warning and substitutes a safe value, so that an
/// infrastructure hiccup never blocks logging a workout.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }
}

/// Exit codes for the fitlevel CLI.
pub mod exit_codes {
    /// The command completed successfully.
    pub const SUCCESS: i32 = 0;

    /// The command ran but reported a failure (bad input, missing athlete).
    pub const FAILURE: i32 = 1;

    /// The process panicked.
    pub const CRASH: i32 = 3;
}
