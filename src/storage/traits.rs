//! Storage traits for athletes and challenges.

use std::sync::Arc;

use crate::core::{AthleteRecord, Challenge};
use crate::error::Result;

/// Trait for athlete storage backends.
///
/// `put` must replace the whole record atomically: readers see either the
/// previous record or the new one, never a mix.
pub trait AthleteStore: Send + Sync {
    /// Retrieve an athlete by ID.
    ///
    /// Returns `Ok(None)` if the athlete doesn't exist.
    fn get(&self, id: &str) -> Result<Option<AthleteRecord>>;

    /// Create or replace an athlete record.
    fn put(&self, athlete: &AthleteRecord) -> Result<()>;

    /// IDs of every stored athlete, sorted.
    ///
    /// Listing IDs without loading records lets a sweep load and fail on
    /// each athlete independently.
    fn ids(&self) -> Result<Vec<String>>;

    /// Check if an athlete exists.
    fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.get(id)?.is_some())
    }
}

impl<T: AthleteStore + ?Sized> AthleteStore for Arc<T> {
    fn get(&self, id: &str) -> Result<Option<AthleteRecord>> {
        (**self).get(id)
    }

    fn put(&self, athlete: &AthleteRecord) -> Result<()> {
        (**self).put(athlete)
    }

    fn ids(&self) -> Result<Vec<String>> {
        (**self).ids()
    }
}

/// Trait for challenge storage backends. Same atomicity rule as
/// [`AthleteStore::put`].
pub trait ChallengeStore: Send + Sync {
    /// Retrieve a challenge by ID.
    fn get(&self, id: u64) -> Result<Option<Challenge>>;

    /// Create or replace a challenge.
    fn put(&self, challenge: &Challenge) -> Result<()>;

    /// IDs of every stored challenge, ascending.
    fn ids(&self) -> Result<Vec<u64>>;

    /// The ID a new challenge should take.
    fn next_id(&self) -> Result<u64> {
        Ok(self.ids()?.into_iter().max().map_or(1, |id| id + 1))
    }
}

impl<T: ChallengeStore + ?Sized> ChallengeStore for Arc<T> {
    fn get(&self, id: u64) -> Result<Option<Challenge>> {
        (**self).get(id)
    }

    fn put(&self, challenge: &Challenge) -> Result<()> {
        (**self).put(challenge)
    }

    fn ids(&self) -> Result<Vec<u64>> {
        (**self).ids()
    }
}

/// Test utilities for store implementations.
#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::core::{ChallengeGoal, Participant, UserProgress};
    use chrono::{Duration, Utc};

    /// Shared contract check for AthleteStore implementations.
    pub fn test_athlete_store_crud<S: AthleteStore>(store: &S) {
        let athlete = AthleteRecord::new("ana", UserProgress::default(), Utc::now()).unwrap();

        assert!(!store.exists(&athlete.id).unwrap());
        assert!(store.get(&athlete.id).unwrap().is_none());
        assert!(store.ids().unwrap().is_empty());

        store.put(&athlete).unwrap();

        assert!(store.exists(&athlete.id).unwrap());
        let retrieved = store.get(&athlete.id).unwrap().unwrap();
        assert_eq!(retrieved, athlete);
        assert_eq!(store.ids().unwrap(), vec!["ana".to_string()]);

        // Replace
        let mut updated = athlete.clone();
        updated.progress.add_xp(450);
        store.put(&updated).unwrap();
        let retrieved = store.get(&athlete.id).unwrap().unwrap();
        assert_eq!(retrieved.progress.cumulative_xp(), 450);
        assert_eq!(retrieved.progress.level(), 2);
        assert_eq!(store.ids().unwrap().len(), 1);
    }

    /// A one-participant challenge for store tests.
    pub fn sample_challenge(id: u64) -> Challenge {
        let now = Utc::now();
        Challenge {
            id,
            title: format!("Challenge {}", id),
            description: None,
            creator_id: "ana".to_string(),
            goal: ChallengeGoal::Distance,
            target: 100.0,
            start: now,
            end: now + Duration::days(30),
            filter: None,
            participants: vec![Participant {
                athlete_id: "ana".to_string(),
                joined_at: now,
                completed_at: None,
            }],
            created_at: now,
        }
    }

    /// Shared contract check for ChallengeStore implementations.
    pub fn test_challenge_store_crud<S: ChallengeStore>(store: &S) {
        assert!(store.get(1).unwrap().is_none());
        assert!(store.ids().unwrap().is_empty());
        assert_eq!(store.next_id().unwrap(), 1);

        store.put(&sample_challenge(1)).unwrap();
        store.put(&sample_challenge(3)).unwrap();
        assert_eq!(store.ids().unwrap(), vec![1, 3]);
        assert_eq!(store.next_id().unwrap(), 4);

        // Replace
        let mut updated = store.get(1).unwrap().unwrap();
        updated.participants.clear();
        store.put(&updated).unwrap();
        assert_eq!(store.get(1).unwrap().unwrap(), updated);
        assert_eq!(store.ids().unwrap().len(), 2);
    }
}
