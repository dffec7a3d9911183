//! Challenge command for fitlevel.
//!
//! Creates challenges, manages who takes part, and shows the leaderboard.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::cli::render;
use crate::core::{normalize_athlete_id, Challenge, ChallengeGoal, WorkoutFilter};
use crate::engine::{Challenges, Leaderboard, NewChallenge};
use crate::error::Result;
use crate::storage::{AthleteStore, ChallengeStore};

/// Options for the challenge command.
#[derive(Debug, Clone, Default)]
pub struct ChallengeOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Challenge definition as given on the command line.
#[derive(Debug, Clone)]
pub struct ChallengeInput {
    pub title: String,
    pub description: Option<String>,
    pub goal: ChallengeGoal,
    pub target: f64,
    /// First day counted. Defaults to now.
    pub start: Option<NaiveDate>,
    /// Last day counted, inclusive. Overrides `days`.
    pub end: Option<NaiveDate>,
    /// Window length when no end date is given.
    pub days: u32,
    pub filter: Option<WorkoutFilter>,
}

impl ChallengeInput {
    /// Resolve dates into a window. Range checks happen on create.
    pub fn to_definition(&self, now: DateTime<Utc>) -> NewChallenge {
        let start = self.start.map_or(now, start_of_day);
        let end = match self.end {
            Some(date) => end_of_day(date),
            None => start + Duration::days(i64::from(self.days)),
        };

        NewChallenge {
            title: self.title.clone(),
            description: self.description.clone(),
            goal: self.goal,
            target: self.target,
            start,
            end,
            filter: self.filter.clone(),
        }
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date) + Duration::days(1) - Duration::seconds(1)
}

/// What the challenge command should do.
#[derive(Debug, Clone)]
pub enum ChallengeAction {
    Create {
        creator: String,
        input: ChallengeInput,
    },
    Join {
        challenge_id: u64,
        athlete: String,
    },
    Leave {
        challenge_id: u64,
        athlete: String,
    },
    Show {
        challenge_id: u64,
    },
    List {
        athlete: Option<String>,
    },
}

impl ChallengeAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Join { .. } => "join",
            Self::Leave { .. } => "leave",
            Self::Show { .. } => "show",
            Self::List { .. } => "list",
        }
    }
}

/// Output format for the challenge command.
#[derive(Debug, Clone, Serialize)]
pub struct ChallengeOutput {
    pub success: bool,
    /// The action performed.
    pub action: String,
    /// Athlete who joined or left.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub athlete_id: Option<String>,
    /// The challenge after create, join or leave.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge: Option<Challenge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leaderboard: Option<Leaderboard>,
    /// Challenges matched by `list`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenges: Option<Vec<Challenge>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChallengeOutput {
    fn new(action: &ChallengeAction) -> Self {
        Self {
            success: true,
            action: action.name().to_string(),
            athlete_id: None,
            challenge: None,
            leaderboard: None,
            challenges: None,
            error: None,
        }
    }

    fn failure(action: &ChallengeAction, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::new(action)
        }
    }
}

/// The challenge command implementation.
pub struct ChallengeCommand<A: AthleteStore, C: ChallengeStore> {
    challenges: Challenges<A, C>,
}

impl<A: AthleteStore, C: ChallengeStore> ChallengeCommand<A, C> {
    /// Create a new challenge command.
    pub fn new(challenges: Challenges<A, C>) -> Self {
        Self { challenges }
    }

    /// Run the challenge command.
    pub fn run(&self, action: &ChallengeAction) -> ChallengeOutput {
        self.run_at(action, Utc::now())
    }

    /// Run the challenge command at a given time.
    pub fn run_at(&self, action: &ChallengeAction, now: DateTime<Utc>) -> ChallengeOutput {
        match self.perform(action, now) {
            Ok(output) => output,
            Err(e) => ChallengeOutput::failure(action, e.to_string()),
        }
    }

    fn perform(&self, action: &ChallengeAction, now: DateTime<Utc>) -> Result<ChallengeOutput> {
        let mut output = ChallengeOutput::new(action);

        match action {
            ChallengeAction::Create { creator, input } => {
                let challenge = self
                    .challenges
                    .create(creator, input.to_definition(now), now)?;
                output.athlete_id = Some(challenge.creator_id.clone());
                output.challenge = Some(challenge);
            }
            ChallengeAction::Join {
                challenge_id,
                athlete,
            } => {
                output.challenge = Some(self.challenges.join(*challenge_id, athlete, now)?);
                output.athlete_id = normalize_athlete_id(athlete).ok();
            }
            ChallengeAction::Leave {
                challenge_id,
                athlete,
            } => {
                output.challenge = Some(self.challenges.leave(*challenge_id, athlete, now)?);
                output.athlete_id = normalize_athlete_id(athlete).ok();
            }
            ChallengeAction::Show { challenge_id } => {
                output.leaderboard = Some(self.challenges.standings(*challenge_id, now)?);
            }
            ChallengeAction::List { athlete } => {
                output.challenges = Some(self.challenges.list(athlete.as_deref())?);
            }
        }

        Ok(output)
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ChallengeOutput, options: &ChallengeOptions) -> String {
        render(output, options.json, options.quiet, format_human_readable)
    }
}

fn format_human_readable(output: &ChallengeOutput) -> String {
    if !output.success {
        return format!(
            "Challenge {} failed: {}\n",
            output.action,
            output.error.as_deref().unwrap_or("unknown error")
        );
    }

    let athlete = output.athlete_id.as_deref().unwrap_or("athlete");

    if let Some(board) = &output.leaderboard {
        return format_leaderboard(board);
    }

    if let Some(challenges) = &output.challenges {
        if challenges.is_empty() {
            return "No challenges.\n".to_string();
        }
        return challenges
            .iter()
            .map(|c| format!("{} ({} taking part)\n", headline(c), c.participants.len()))
            .collect();
    }

    match (output.action.as_str(), &output.challenge) {
        ("create", Some(c)) => format!("Created {}\n", headline(c)),
        ("join", Some(c)) => format!("{} joined #{} {}\n", athlete, c.id, c.title),
        ("leave", Some(c)) => format!("{} left #{} {}\n", athlete, c.id, c.title),
        _ => String::new(),
    }
}

/// `#1 Title: 50 km of cardio, 2026-10-01 to 2026-10-31`
fn headline(challenge: &Challenge) -> String {
    let scope = challenge
        .filter
        .as_ref()
        .map(|f| format!(" of {}", f))
        .unwrap_or_default();
    format!(
        "#{} {}: {} {}{}, {} to {}",
        challenge.id,
        challenge.title,
        challenge.target,
        challenge.goal.unit(),
        scope,
        challenge.start.format("%Y-%m-%d"),
        challenge.end.format("%Y-%m-%d"),
    )
}

fn format_leaderboard(board: &Leaderboard) -> String {
    let challenge = &board.challenge;
    let mut out = format!("{}\n", headline(challenge));
    if let Some(description) = &challenge.description {
        out.push_str(&format!("{}\n", description));
    }

    for standing in &board.standings {
        let done = if standing.completed_at.is_some() {
            "  completed"
        } else {
            ""
        };
        out.push_str(&format!(
            "{:>3}. {:<16} {:.1} / {} {} ({:.0}%){}\n",
            standing.rank,
            standing.username,
            standing.progress.current,
            challenge.target,
            challenge.goal.unit(),
            standing.progress.percent,
            done
        ));
    }

    for failure in &board.unavailable {
        out.push_str(&format!("  ! {}: {}\n", failure.athlete_id, failure.error));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecayConfig;
    use crate::core::{WorkoutRecord, WorkoutType};
    use crate::engine::Ledger;
    use crate::storage::{MemoryAthleteStore, MemoryChallengeStore};
    use chrono::TimeZone;
    use std::sync::Arc;

    type Command = ChallengeCommand<Arc<MemoryAthleteStore>, MemoryChallengeStore>;

    fn setup(now: DateTime<Utc>) -> (Ledger<Arc<MemoryAthleteStore>>, Command) {
        let athletes = Arc::new(MemoryAthleteStore::new());
        let ledger = Ledger::new(Arc::clone(&athletes), DecayConfig::default());
        ledger.register("ana", now - Duration::days(60)).unwrap();
        ledger.register("Max", now - Duration::days(60)).unwrap();
        let cmd = ChallengeCommand::new(Challenges::new(athletes, MemoryChallengeStore::new()));
        (ledger, cmd)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 10, 12, 0, 0).unwrap()
    }

    fn input(goal: ChallengeGoal, target: f64) -> ChallengeInput {
        ChallengeInput {
            title: "October run".to_string(),
            description: None,
            goal,
            target,
            start: NaiveDate::from_ymd_opt(2026, 10, 1),
            end: NaiveDate::from_ymd_opt(2026, 10, 31),
            days: 30,
            filter: None,
        }
    }

    fn create(cmd: &Command, input: ChallengeInput) -> ChallengeOutput {
        cmd.run_at(
            &ChallengeAction::Create {
                creator: "ana".to_string(),
                input,
            },
            now(),
        )
    }

    #[test]
    fn test_definition_dates() {
        let definition = input(ChallengeGoal::Distance, 50.0).to_definition(now());
        assert_eq!(
            definition.start,
            Utc.with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            definition.end,
            Utc.with_ymd_and_hms(2026, 10, 31, 23, 59, 59).unwrap()
        );

        let rolling = ChallengeInput {
            start: None,
            end: None,
            days: 7,
            ..input(ChallengeGoal::Workouts, 5.0)
        }
        .to_definition(now());
        assert_eq!(rolling.start, now());
        assert_eq!(rolling.end, now() + Duration::days(7));
    }

    #[test]
    fn test_create_and_list() {
        let (_ledger, cmd) = setup(now());

        let output = create(&cmd, input(ChallengeGoal::Distance, 50.0));
        assert!(output.success);
        assert_eq!(output.action, "create");
        let text = cmd.format_output(&output, &ChallengeOptions::default());
        assert_eq!(
            text,
            "Created #1 October run: 50 km, 2026-10-01 to 2026-10-31\n"
        );

        let list = cmd.run_at(&ChallengeAction::List { athlete: None }, now());
        assert_eq!(list.challenges.as_ref().unwrap().len(), 1);
        let text = cmd.format_output(&list, &ChallengeOptions::default());
        assert!(text.contains("(1 taking part)"));

        let none = cmd.run_at(
            &ChallengeAction::List {
                athlete: Some("max".to_string()),
            },
            now(),
        );
        assert_eq!(
            cmd.format_output(&none, &ChallengeOptions::default()),
            "No challenges.\n"
        );
    }

    #[test]
    fn test_create_rejects_end_before_start() {
        let (_ledger, cmd) = setup(now());
        let backwards = ChallengeInput {
            start: NaiveDate::from_ymd_opt(2026, 11, 1),
            ..input(ChallengeGoal::Distance, 50.0)
        };

        let output = create(&cmd, backwards);
        assert!(!output.success);
        let text = cmd.format_output(&output, &ChallengeOptions::default());
        assert!(text.starts_with("Challenge create failed: invalid challenge"));
    }

    #[test]
    fn test_join_show_leave() {
        let (ledger, cmd) = setup(now());
        let filtered = ChallengeInput {
            filter: WorkoutFilter::parse("cardio_running"),
            ..input(ChallengeGoal::Workouts, 2.0)
        };
        create(&cmd, filtered);

        let joined = cmd.run_at(
            &ChallengeAction::Join {
                challenge_id: 1,
                athlete: "MAX".to_string(),
            },
            now(),
        );
        assert!(joined.success);
        assert_eq!(
            cmd.format_output(&joined, &ChallengeOptions::default()),
            "max joined #1 October run\n"
        );

        let running = WorkoutRecord::new(WorkoutType::Cardio, "Run", 30, 6)
            .with_subtype("cardio_running")
            .with_distance(5.0);
        let cycling = WorkoutRecord::new(WorkoutType::Cardio, "Ride", 60, 6)
            .with_subtype("cardio_cycling")
            .with_distance(20.0);
        for days_ago in [1, 3] {
            ledger
                .log_workout("max", running.clone(), now() - Duration::days(days_ago))
                .unwrap();
        }
        ledger
            .log_workout("ana", running, now() - Duration::days(2))
            .unwrap();
        ledger
            .log_workout("ana", cycling, now() - Duration::days(2))
            .unwrap();

        let shown = cmd.run_at(&ChallengeAction::Show { challenge_id: 1 }, now());
        assert!(shown.success);
        let board = shown.leaderboard.as_ref().unwrap();
        assert_eq!(board.standings[0].athlete_id, "max");
        assert!(board.standings[0].completed_at.is_some());
        assert_eq!(board.standings[1].progress.workouts, 1);

        let text = cmd.format_output(&shown, &ChallengeOptions::default());
        assert!(text.starts_with("#1 October run: 2 workouts of cardio_running"));
        assert!(text.contains("  1. Max"));
        assert!(text.contains("(100%)  completed"));
        assert!(text.contains("  2. ana"));
        assert!(text.contains("(50%)\n"));

        let left = cmd.run_at(
            &ChallengeAction::Leave {
                challenge_id: 1,
                athlete: "max".to_string(),
            },
            now(),
        );
        assert!(left.success);
        assert!(left.challenge.unwrap().participant("max").is_none());
    }

    #[test]
    fn test_unknown_challenge() {
        let (_ledger, cmd) = setup(now());
        let output = cmd.run_at(&ChallengeAction::Show { challenge_id: 7 }, now());

        assert!(!output.success);
        assert_eq!(output.error.as_deref(), Some("challenge not found: 7"));
    }

    #[test]
    fn test_json_output() {
        let (_ledger, cmd) = setup(now());
        let output = create(&cmd, input(ChallengeGoal::Distance, 50.0));
        let options = ChallengeOptions {
            json: true,
            quiet: false,
        };

        let parsed: serde_json::Value =
            serde_json::from_str(&cmd.format_output(&output, &options)).unwrap();
        assert_eq!(parsed["action"], "create");
        assert_eq!(parsed["challenge"]["goal"], "distance");
        assert_eq!(parsed["challenge"]["participants"][0]["athlete_id"], "ana");
        assert!(parsed.get("leaderboard").is_none());
    }
}
