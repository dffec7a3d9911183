//! In-memory athlete and challenge storage.
//!
//! Thread-safe, non-persistent. Used by tests and by callers that manage
//! persistence themselves.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

use crate::core::{AthleteRecord, Challenge};
use crate::error::Result;
use crate::storage::{AthleteStore, ChallengeStore};

// A panic while holding a lock cannot leave a half-written record: every
// write is a single map insert, so poisoned locks are recovered.

/// In-memory athlete store backed by `RwLock<HashMap>`.
#[derive(Debug, Default)]
pub struct MemoryAthleteStore {
    athletes: RwLock<HashMap<String, AthleteRecord>>,
}

impl MemoryAthleteStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl AthleteStore for MemoryAthleteStore {
    fn get(&self, id: &str) -> Result<Option<AthleteRecord>> {
        let athletes = self.athletes.read().unwrap_or_else(PoisonError::into_inner);
        Ok(athletes.get(id).cloned())
    }

    fn put(&self, athlete: &AthleteRecord) -> Result<()> {
        self.athletes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(athlete.id.clone(), athlete.clone());
        Ok(())
    }

    fn ids(&self) -> Result<Vec<String>> {
        let athletes = self.athletes.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<String> = athletes.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

/// In-memory challenge store, ordered by id.
#[derive(Debug, Default)]
pub struct MemoryChallengeStore {
    challenges: RwLock<BTreeMap<u64, Challenge>>,
}

impl MemoryChallengeStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChallengeStore for MemoryChallengeStore {
    fn get(&self, id: u64) -> Result<Option<Challenge>> {
        let challenges = self.challenges.read().unwrap_or_else(PoisonError::into_inner);
        Ok(challenges.get(&id).cloned())
    }

    fn put(&self, challenge: &Challenge) -> Result<()> {
        self.challenges
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(challenge.id, challenge.clone());
        Ok(())
    }

    fn ids(&self) -> Result<Vec<u64>> {
        let challenges = self.challenges.read().unwrap_or_else(PoisonError::into_inner);
        Ok(challenges.keys().copied().collect())
    }
}
