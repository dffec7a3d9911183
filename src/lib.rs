//! fitlevel - Workout XP, leveling and inactivity decay
//!
//! Athletes earn XP for logged workouts, climb a level curve and rank
//! ladder, and lose a share of their XP after a grace period without
//! training. Athletes can race each other in time-boxed challenges.
//! Athletes and challenges persist as JSON documents; every state change is
//! appended to a JSONL activity log.

pub mod cli;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod events;
pub mod storage;
pub mod util;

pub use config::{Config, DecayConfig, SweepConfig};
pub use core::{
    challenge_progress, level_for_xp, rank_for_xp, AthleteRecord, Challenge, ChallengeGoal,
    ChallengeProgress, Exercise, ExerciseSet, LevelChange, LevelSnapshot, LoggedWorkout,
    Participant, Rank, UserProgress, WorkoutFilter, WorkoutRecord, WorkoutType,
};
pub use engine::{
    apply_decay, calculate_decay, run_decay_sweep, xp_for_workout, AthleteStatus, Challenges,
    DecayAssessment, DecayState, Leaderboard, Ledger, NewChallenge, Standing, SweepReport,
    WeeklySummary, XpBreakdown,
};
pub use error::{FitError, Result};
pub use events::{ActivityEvent, ActivityEventType, ActivityLog, ACTIVITY_SCHEMA_VERSION};
pub use storage::{
    AthleteStore, ChallengeStore, FileAthleteStore, FileChallengeStore, MemoryAthleteStore,
    MemoryChallengeStore,
};

// CLI commands
pub use cli::{
    ChallengeCommand, ClearCommand, DecayCommand, DeleteCommand, EditCommand, HistoryCommand,
    LogCommand, RegisterCommand, RelevelCommand, StatusCommand, WorkoutsCommand,
};
