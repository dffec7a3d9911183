//! Athlete and challenge storage for fitlevel.
//!
//! One record per athlete is the unit of persistence. A ledger operation
//! reads a record, changes it, and writes it back with a single `put`, so
//! a record on disk always holds consistent XP, level and workouts.
//! Challenges are stored the same way, one record each.

pub mod file;
pub mod memory;
pub mod traits;

pub use file::{FileAthleteStore, FileChallengeStore};
pub use memory::{MemoryAthleteStore, MemoryChallengeStore};
pub use traits::{AthleteStore, ChallengeStore};
