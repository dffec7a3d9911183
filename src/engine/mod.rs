//! XP scoring, decay and the ledger that persists their results.
//!
//! `accrual` and `decay` are pure calculations over core types. `ledger`
//! wires them to an [`AthleteStore`](crate::storage::AthleteStore) so each
//! operation is one load, one change and one commit. `challenges` does the
//! same for challenge records.

pub mod accrual;
pub mod challenges;
pub mod decay;
pub mod ledger;
pub mod summary;

pub use accrual::{breakdown, weights, xp_for_workout, XpBreakdown};
pub use challenges::{Challenges, Leaderboard, NewChallenge, Standing};
pub use decay::{
    apply_decay, calculate_decay, decay_warnings, run_decay_sweep, should_run_decay_sweep,
    DecayAssessment, DecayState, DecayWarning, DecayedAthlete, SweepFailure, SweepReport,
};
pub use ledger::{
    AthleteStatus, ClearOutcome, Ledger, RelevelReport, RemovalOutcome, RepairedLevel,
    ReplaceOutcome, WorkoutOutcome,
};
pub use summary::{weekly_summary, WeeklySummary};
