//! Challenge membership and standings.
//!
//! Challenges live in their own store and reference athletes by id. Taking
//! standings loads every participant, measures progress from their logged
//! workouts, and stamps first completions back onto the challenge in one
//! commit.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{
    challenge_progress, normalize_athlete_id, Challenge, ChallengeGoal, ChallengeProgress,
    WorkoutFilter,
};
use crate::engine::decay::SweepFailure;
use crate::error::{FailOpen, FitError, Result};
use crate::events::{ActivityEventType, ActivityLog};
use crate::storage::{AthleteStore, ChallengeStore};

/// Definition of a challenge to create.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChallenge {
    pub title: String,
    pub description: Option<String>,
    pub goal: ChallengeGoal,
    pub target: f64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub filter: Option<WorkoutFilter>,
}

/// One row of a challenge leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub rank: usize,
    pub athlete_id: String,
    pub username: String,
    pub progress: ChallengeProgress,
    pub joined_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Participants ranked by progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub challenge: Challenge,
    pub standings: Vec<Standing>,
    /// Participants whose records could not be loaded.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unavailable: Vec<SweepFailure>,
}

/// Challenge operations over an athlete store and a challenge store.
#[derive(Debug)]
pub struct Challenges<A: AthleteStore, C: ChallengeStore> {
    athletes: A,
    challenges: C,
    log: Option<ActivityLog>,
}

impl<A: AthleteStore, C: ChallengeStore> Challenges<A, C> {
    pub fn new(athletes: A, challenges: C) -> Self {
        Self {
            athletes,
            challenges,
            log: None,
        }
    }

    /// Record every change in `log`.
    pub fn with_activity_log(mut self, log: ActivityLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Create a challenge. The creator joins it immediately.
    pub fn create(
        &self,
        creator: &str,
        definition: NewChallenge,
        now: DateTime<Utc>,
    ) -> Result<Challenge> {
        let creator_id = self.require_athlete(creator)?;

        let mut challenge = Challenge {
            id: self.challenges.next_id()?,
            title: definition.title.trim().to_string(),
            description: definition
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            creator_id: creator_id.clone(),
            goal: definition.goal,
            target: definition.target,
            start: definition.start,
            end: definition.end,
            filter: definition.filter,
            participants: Vec::new(),
            created_at: now,
        };
        challenge.validate()?;
        challenge.join(&creator_id, now)?;

        self.challenges.put(&challenge)?;

        tracing::info!(challenge_id = challenge.id, creator = %creator_id, "created challenge");
        self.record(
            ActivityEventType::ChallengeCreated {
                athlete_id: creator_id,
                challenge_id: challenge.id,
            },
            now,
        );

        Ok(challenge)
    }

    /// Load a challenge.
    pub fn challenge(&self, challenge_id: u64) -> Result<Challenge> {
        self.challenges
            .get(challenge_id)?
            .ok_or_else(|| FitError::challenge_not_found(challenge_id))
    }

    /// Every readable challenge, or only those `athlete` takes part in.
    ///
    /// Unreadable challenge files are skipped with a warning.
    pub fn list(&self, athlete: Option<&str>) -> Result<Vec<Challenge>> {
        let athlete_id = athlete.map(normalize_athlete_id).transpose()?;

        let mut challenges = Vec::new();
        for id in self.challenges.ids()? {
            match self.challenges.get(id) {
                Ok(Some(challenge)) => {
                    let included = athlete_id
                        .as_deref()
                        .is_none_or(|a| challenge.participant(a).is_some());
                    if included {
                        challenges.push(challenge);
                    }
                }
                Ok(None) => {}
                Err(err) => tracing::warn!(challenge_id = id, error = %err, "skipping unreadable challenge"),
            }
        }

        Ok(challenges)
    }

    /// Add an athlete to a challenge.
    pub fn join(&self, challenge_id: u64, athlete: &str, now: DateTime<Utc>) -> Result<Challenge> {
        let athlete_id = self.require_athlete(athlete)?;
        let mut challenge = self.challenge(challenge_id)?;

        challenge.join(&athlete_id, now)?;
        self.challenges.put(&challenge)?;

        self.record(
            ActivityEventType::ChallengeJoined {
                athlete_id,
                challenge_id,
            },
            now,
        );

        Ok(challenge)
    }

    /// Remove an athlete from a challenge.
    pub fn leave(&self, challenge_id: u64, athlete: &str, now: DateTime<Utc>) -> Result<Challenge> {
        let athlete_id = normalize_athlete_id(athlete)?;
        let mut challenge = self.challenge(challenge_id)?;

        challenge.leave(&athlete_id)?;
        self.challenges.put(&challenge)?;

        self.record(
            ActivityEventType::ChallengeLeft {
                athlete_id,
                challenge_id,
            },
            now,
        );

        Ok(challenge)
    }

    /// Rank every participant by progress, highest first.
    ///
    /// Ties go to whoever completed first, then to the earlier joiner.
    /// Participants reaching the target for the first time get their
    /// completion stamped at `now`.
    pub fn standings(&self, challenge_id: u64, now: DateTime<Utc>) -> Result<Leaderboard> {
        let mut challenge = self.challenge(challenge_id)?;

        let mut standings = Vec::new();
        let mut unavailable = Vec::new();
        let mut newly_completed = Vec::new();

        for participant in challenge.participants.clone() {
            let athlete = match self.athletes.get(&participant.athlete_id) {
                Ok(Some(athlete)) => athlete,
                Ok(None) => {
                    unavailable.push(SweepFailure {
                        error: FitError::athlete_not_found(&participant.athlete_id).to_string(),
                        athlete_id: participant.athlete_id,
                    });
                    continue;
                }
                Err(err) => {
                    tracing::warn!(
                        challenge_id,
                        athlete_id = %participant.athlete_id,
                        error = %err,
                        "leaving participant out of standings"
                    );
                    unavailable.push(SweepFailure {
                        athlete_id: participant.athlete_id,
                        error: err.to_string(),
                    });
                    continue;
                }
            };

            let progress = challenge_progress(&challenge, &athlete.workouts);
            if challenge.mark_completed(&athlete.id, &progress, now) {
                newly_completed.push(athlete.id.clone());
            }

            standings.push(Standing {
                rank: 0,
                completed_at: challenge
                    .participant(&athlete.id)
                    .and_then(|p| p.completed_at),
                athlete_id: athlete.id,
                username: athlete.username,
                progress,
                joined_at: participant.joined_at,
            });
        }

        standings.sort_by(compare_standings);
        for (i, standing) in standings.iter_mut().enumerate() {
            standing.rank = i + 1;
        }

        if !newly_completed.is_empty() {
            self.challenges.put(&challenge)?;
            for athlete_id in newly_completed {
                tracing::info!(challenge_id, athlete_id = %athlete_id, "challenge completed");
                self.record(
                    ActivityEventType::ChallengeCompleted {
                        athlete_id,
                        challenge_id,
                    },
                    now,
                );
            }
        }

        Ok(Leaderboard {
            challenge,
            standings,
            unavailable,
        })
    }

    fn require_athlete(&self, athlete: &str) -> Result<String> {
        let id = normalize_athlete_id(athlete)?;
        if !self.athletes.exists(&id)? {
            return Err(FitError::athlete_not_found(id));
        }
        Ok(id)
    }

    fn record(&self, data: ActivityEventType, now: DateTime<Utc>) {
        if let Some(log) = &self.log {
            log.record(data, now)
                .fail_open_default("Failed to write activity log");
        }
    }
}

fn compare_standings(a: &Standing, b: &Standing) -> Ordering {
    b.progress
        .percent
        .total_cmp(&a.progress.percent)
        .then_with(|| match (a.completed_at, b.completed_at) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.joined_at.cmp(&b.joined_at))
        .then_with(|| a.athlete_id.cmp(&b.athlete_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecayConfig;
    use crate::core::{WorkoutRecord, WorkoutType};
    use crate::engine::Ledger;
    use crate::storage::{FileAthleteStore, MemoryAthleteStore, MemoryChallengeStore};
    use chrono::Duration;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        ledger: Ledger<Arc<MemoryAthleteStore>>,
        challenges: Challenges<Arc<MemoryAthleteStore>, MemoryChallengeStore>,
        now: DateTime<Utc>,
    }

    fn fixture() -> Fixture {
        let now = Utc::now();
        let athletes = Arc::new(MemoryAthleteStore::new());
        let ledger = Ledger::new(Arc::clone(&athletes), DecayConfig::default());
        for name in ["Ana", "max", "zoe"] {
            ledger.register(name, now - Duration::days(30)).unwrap();
        }
        Fixture {
            ledger,
            challenges: Challenges::new(athletes, MemoryChallengeStore::new()),
            now,
        }
    }

    fn run(km: f64) -> WorkoutRecord {
        WorkoutRecord::new(WorkoutType::Cardio, "Run", 30, 6).with_distance(km)
    }

    fn distance_challenge(now: DateTime<Utc>, target: f64) -> NewChallenge {
        NewChallenge {
            title: " 50k in a month ".to_string(),
            description: Some("  ".to_string()),
            goal: ChallengeGoal::Distance,
            target,
            start: now - Duration::days(10),
            end: now + Duration::days(20),
            filter: WorkoutFilter::parse("cardio"),
        }
    }

    #[test]
    fn test_create_joins_creator() {
        let f = fixture();
        let challenge = f
            .challenges
            .create("ANA", distance_challenge(f.now, 50.0), f.now)
            .unwrap();

        assert_eq!(challenge.id, 1);
        assert_eq!(challenge.title, "50k in a month");
        assert!(challenge.description.is_none());
        assert_eq!(challenge.creator_id, "ana");
        assert!(challenge.participant("ana").is_some());

        let second = f
            .challenges
            .create("max", distance_challenge(f.now, 10.0), f.now)
            .unwrap();
        assert_eq!(second.id, 2);
    }

    #[test]
    fn test_create_rejects_bad_definitions() {
        let f = fixture();

        let ghost = f
            .challenges
            .create("ghost", distance_challenge(f.now, 50.0), f.now);
        assert!(matches!(ghost, Err(FitError::AthleteNotFound { .. })));

        let zero = f
            .challenges
            .create("ana", distance_challenge(f.now, 0.0), f.now);
        assert!(matches!(zero, Err(FitError::InvalidChallenge { .. })));

        assert!(f.challenges.list(None).unwrap().is_empty());
    }

    #[test]
    fn test_join_leave_and_list() {
        let f = fixture();
        let challenge = f
            .challenges
            .create("ana", distance_challenge(f.now, 50.0), f.now)
            .unwrap();

        f.challenges.join(challenge.id, "max", f.now).unwrap();
        assert!(f.challenges.join(challenge.id, "max", f.now).is_err());
        assert!(matches!(
            f.challenges.join(challenge.id, "ghost", f.now),
            Err(FitError::AthleteNotFound { .. })
        ));
        assert!(matches!(
            f.challenges.join(99, "max", f.now),
            Err(FitError::ChallengeNotFound { challenge_id: 99 })
        ));

        assert_eq!(f.challenges.list(Some("max")).unwrap().len(), 1);
        assert!(f.challenges.list(Some("zoe")).unwrap().is_empty());

        let after = f.challenges.leave(challenge.id, "max", f.now).unwrap();
        assert!(after.participant("max").is_none());
        assert!(f.challenges.leave(challenge.id, "ana", f.now).is_err());
        assert_eq!(f.challenges.list(None).unwrap().len(), 1);
    }

    #[test]
    fn test_standings_rank_and_stamp_completion() {
        let f = fixture();
        let challenge = f
            .challenges
            .create("ana", distance_challenge(f.now, 20.0), f.now)
            .unwrap();
        f.challenges.join(challenge.id, "max", f.now).unwrap();
        f.challenges.join(challenge.id, "zoe", f.now).unwrap();

        f.ledger.log_workout("ana", run(8.0), f.now - Duration::days(2)).unwrap();
        f.ledger.log_workout("max", run(12.0), f.now - Duration::days(2)).unwrap();
        f.ledger.log_workout("max", run(10.0), f.now - Duration::days(1)).unwrap();
        // Before the window
        f.ledger.log_workout("zoe", run(40.0), f.now - Duration::days(15)).unwrap();

        let board = f.challenges.standings(challenge.id, f.now).unwrap();
        let order: Vec<&str> = board.standings.iter().map(|s| s.athlete_id.as_str()).collect();
        assert_eq!(order, vec!["max", "ana", "zoe"]);
        assert_eq!(board.standings[0].rank, 1);
        assert!((board.standings[0].progress.percent - 110.0).abs() < 1e-9);
        assert_eq!(board.standings[0].progress.workouts, 2);
        assert_eq!(board.standings[0].completed_at, Some(f.now));
        assert_eq!(board.standings[1].username, "Ana");
        assert!(board.standings[1].completed_at.is_none());
        assert_eq!(board.standings[2].progress.current, 0.0);

        // Completion is stored and kept on later views
        let stored = f.challenges.challenge(challenge.id).unwrap();
        assert_eq!(stored.participant("max").unwrap().completed_at, Some(f.now));

        let later = f
            .challenges
            .standings(challenge.id, f.now + Duration::hours(1))
            .unwrap();
        assert_eq!(later.standings[0].completed_at, Some(f.now));
    }

    #[test]
    fn test_standings_tie_goes_to_first_finisher() {
        let f = fixture();
        let challenge = f
            .challenges
            .create("ana", distance_challenge(f.now, 5.0), f.now)
            .unwrap();
        f.challenges.join(challenge.id, "max", f.now).unwrap();

        f.ledger.log_workout("max", run(5.0), f.now - Duration::days(1)).unwrap();
        f.challenges.standings(challenge.id, f.now).unwrap();
        f.ledger.log_workout("ana", run(5.0), f.now).unwrap();

        let board = f
            .challenges
            .standings(challenge.id, f.now + Duration::minutes(5))
            .unwrap();
        assert_eq!(board.standings[0].athlete_id, "max");
        assert_eq!(board.standings[1].athlete_id, "ana");
        assert_eq!(
            board.standings[1].completed_at,
            Some(f.now + Duration::minutes(5))
        );
    }

    #[test]
    fn test_standings_skip_unreadable_participant() {
        let now = Utc::now();
        let dir = TempDir::new().unwrap();
        let athletes = FileAthleteStore::with_dir(dir.path()).unwrap();
        let ledger = Ledger::new(athletes.clone(), DecayConfig::default());
        ledger.register("ana", now).unwrap();
        ledger.register("max", now).unwrap();

        let challenges = Challenges::new(athletes, MemoryChallengeStore::new());
        let challenge = challenges
            .create("ana", distance_challenge(now, 50.0), now)
            .unwrap();
        challenges.join(challenge.id, "max", now).unwrap();
        fs::write(dir.path().join("max.json"), "{ truncated").unwrap();

        let board = challenges.standings(challenge.id, now).unwrap();
        assert_eq!(board.standings.len(), 1);
        assert_eq!(board.unavailable.len(), 1);
        assert_eq!(board.unavailable[0].athlete_id, "max");
    }

    #[test]
    fn test_events_recorded() {
        let f = fixture();
        let dir = TempDir::new().unwrap();
        let log = ActivityLog::new(dir.path().join("activity.log"));
        let challenges = Challenges::new(Arc::clone(f.ledger.store()), MemoryChallengeStore::new())
            .with_activity_log(log.clone());

        let challenge = challenges
            .create("ana", distance_challenge(f.now, 5.0), f.now)
            .unwrap();
        challenges.join(challenge.id, "max", f.now).unwrap();
        f.ledger.log_workout("max", run(6.0), f.now).unwrap();
        challenges.standings(challenge.id, f.now).unwrap();
        challenges.leave(challenge.id, "max", f.now).unwrap();

        let names: Vec<&str> = log
            .read_all()
            .unwrap()
            .iter()
            .map(|e| e.data.event_name())
            .collect();
        assert_eq!(
            names,
            vec![
                "challenge_created",
                "challenge_joined",
                "challenge_completed",
                "challenge_left"
            ]
        );
    }
}
