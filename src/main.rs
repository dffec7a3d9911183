//! fitlevel - workout XP, levels and inactivity decay
//!
//! CLI entry point with global panic handler.

use std::io::Write;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use chrono::NaiveDate;

use fitlevel::cli::challenge::{ChallengeAction, ChallengeInput};
use fitlevel::cli::input::{read_workout_json, WorkoutInput};
use fitlevel::config::{activity_log_path, fitlevel_home, Config};
use fitlevel::core::{ChallengeGoal, WorkoutFilter, WorkoutRecord};
use fitlevel::engine::{Challenges, Ledger};
use fitlevel::error::exit_codes;
use fitlevel::events::ActivityLog;
use fitlevel::storage::{FileAthleteStore, FileChallengeStore};

// =============================================================================
// CLI Definition
// =============================================================================

/// fitlevel - earn XP from workouts, level up, and lose XP when idle
#[derive(Parser)]
#[command(name = "fitlevel")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output flags shared by every command.
#[derive(Args, Debug, Clone, Copy)]
struct OutputArgs {
    /// Output as JSON
    #[arg(long, short)]
    json: bool,
    /// Suppress output
    #[arg(long, short)]
    quiet: bool,
}

/// Workout fields for `log` and `edit`.
#[derive(Args, Debug, Clone)]
struct WorkoutArgs {
    /// Workout type (cardio, strength, flexibility)
    #[arg(long = "type", required_unless_present = "stdin")]
    workout_type: Option<String>,
    /// Workout name
    #[arg(long, required_unless_present = "stdin")]
    name: Option<String>,
    /// Duration in minutes
    #[arg(long, required_unless_present = "stdin")]
    duration: Option<u32>,
    /// Perceived intensity (1-10)
    #[arg(long, required_unless_present = "stdin")]
    intensity: Option<u8>,
    /// Distance in kilometres
    #[arg(long)]
    distance: Option<f64>,
    /// Subtype label (e.g., cardio_running, strength_push)
    #[arg(long)]
    subtype: Option<String>,
    /// Notes
    #[arg(long)]
    notes: Option<String>,
    /// Exercise as NAME:REPSxKG,... (repeatable)
    #[arg(long = "exercise")]
    exercises: Vec<String>,
    /// Flat volume: number of sets
    #[arg(long)]
    sets: Option<u32>,
    /// Flat volume: reps per set
    #[arg(long)]
    reps: Option<u32>,
    /// Read the workout as JSON from stdin instead
    #[arg(long)]
    stdin: bool,
}

impl WorkoutArgs {
    fn to_record(&self) -> fitlevel::Result<WorkoutRecord> {
        if self.stdin {
            return read_workout_json(std::io::stdin().lock());
        }

        WorkoutInput {
            workout_type: self.workout_type.clone().unwrap_or_default(),
            name: self.name.clone().unwrap_or_default(),
            duration_minutes: self.duration.unwrap_or_default(),
            intensity: self.intensity.unwrap_or_default(),
            distance_km: self.distance,
            subtype: self.subtype.clone(),
            notes: self.notes.clone(),
            exercises: self.exercises.clone(),
            sets: self.sets,
            reps: self.reps,
        }
        .to_record()
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new athlete
    Register {
        /// Username (letters, digits, '-' and '_')
        username: String,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Log a workout and earn XP
    Log {
        /// Athlete username
        athlete: String,
        #[command(flatten)]
        workout: WorkoutArgs,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show level, rank, decay countdown and weekly summary
    Status {
        /// Athlete username
        athlete: String,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// List logged workouts, newest first
    Workouts {
        /// Athlete username
        athlete: String,
        /// Maximum number of workouts to show
        #[arg(long, short, default_value = "20")]
        limit: usize,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Delete a workout and revert its XP
    Delete {
        /// Athlete username
        athlete: String,
        /// Workout id (see `workouts`)
        workout_id: u64,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Replace a workout's details and rescore it
    Edit {
        /// Athlete username
        athlete: String,
        /// Workout id (see `workouts`)
        workout_id: u64,
        #[command(flatten)]
        workout: WorkoutArgs,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Remove every workout and reset to level 1
    Clear {
        /// Athlete username
        athlete: String,
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Apply inactivity decay (all athletes, throttled)
    Decay {
        /// Only decay this athlete
        #[arg(long)]
        athlete: Option<String>,
        /// Run even if the last sweep was recent
        #[arg(long)]
        force: bool,
        /// List athletes whose grace period ends within N days
        #[arg(long)]
        warn_days: Option<u32>,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Re-derive every stored level from stored XP
    Relevel {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show an athlete's recorded activity, newest first
    History {
        /// Athlete username
        athlete: String,
        /// Maximum number of events to show
        #[arg(long, short, default_value = "20")]
        limit: usize,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Create, join and rank group challenges
    Challenge {
        #[command(subcommand)]
        action: ChallengeCommands,
    },
}

#[derive(Subcommand)]
enum ChallengeCommands {
    /// Create a challenge; the creator joins it
    Create {
        /// Creator's username
        creator: String,
        /// Challenge title
        #[arg(long)]
        title: String,
        /// Longer description
        #[arg(long)]
        description: Option<String>,
        /// Goal kind (distance, workouts)
        #[arg(long, value_parser = parse_goal)]
        goal: ChallengeGoal,
        /// Target in km or workouts
        #[arg(long)]
        target: f64,
        /// First day, YYYY-MM-DD (default: now)
        #[arg(long, value_parser = parse_date)]
        start: Option<NaiveDate>,
        /// Last day, YYYY-MM-DD, inclusive
        #[arg(long, value_parser = parse_date, conflicts_with = "days")]
        end: Option<NaiveDate>,
        /// Window length in days when no end date is given
        #[arg(long, default_value = "30")]
        days: u32,
        /// Only count this workout type or subtype (e.g. cardio, strength_push)
        #[arg(long = "type", value_parser = parse_filter)]
        filter: Option<WorkoutFilter>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Join a challenge
    Join {
        /// Challenge id
        challenge_id: u64,
        /// Athlete username
        athlete: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Leave a challenge
    Leave {
        /// Challenge id
        challenge_id: u64,
        /// Athlete username
        athlete: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Show the leaderboard
    Show {
        /// Challenge id
        challenge_id: u64,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// List challenges
    List {
        /// Only challenges this athlete takes part in
        #[arg(long)]
        athlete: Option<String>,
        #[command(flatten)]
        output: OutputArgs,
    },
}

impl ChallengeCommands {
    fn into_action(self) -> (ChallengeAction, OutputArgs) {
        match self {
            Self::Create {
                creator,
                title,
                description,
                goal,
                target,
                start,
                end,
                days,
                filter,
                output,
            } => (
                ChallengeAction::Create {
                    creator,
                    input: ChallengeInput {
                        title,
                        description,
                        goal,
                        target,
                        start,
                        end,
                        days,
                        filter,
                    },
                },
                output,
            ),
            Self::Join {
                challenge_id,
                athlete,
                output,
            } => (
                ChallengeAction::Join {
                    challenge_id,
                    athlete,
                },
                output,
            ),
            Self::Leave {
                challenge_id,
                athlete,
                output,
            } => (
                ChallengeAction::Leave {
                    challenge_id,
                    athlete,
                },
                output,
            ),
            Self::Show {
                challenge_id,
                output,
            } => (ChallengeAction::Show { challenge_id }, output),
            Self::List { athlete, output } => (ChallengeAction::List { athlete }, output),
        }
    }
}

fn parse_goal(value: &str) -> Result<ChallengeGoal, String> {
    ChallengeGoal::parse(value).ok_or_else(|| format!("unknown goal '{}'", value))
}

fn parse_filter(value: &str) -> Result<WorkoutFilter, String> {
    WorkoutFilter::parse(value).ok_or_else(|| {
        format!(
            "unknown workout type '{}' (expected cardio, strength, flexibility or <type>_<detail>)",
            value
        )
    })
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{}' (expected YYYY-MM-DD)", value))
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("fitlevel error: {}", e);
            ExitCode::from(exit_codes::FAILURE as u8)
        }
    }
}

/// Install the tracing subscriber. Logs go to stderr so `--json` output
/// on stdout stays parseable.
fn init_tracing(verbose: bool) {
    let log_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Set up the global panic handler.
///
/// On panic, logs to $FITLEVEL_HOME/crash.log and exits with code 3.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("fitlevel panic: {}", info);

        if let Some(home) = fitlevel_home() {
            let _ = std::fs::create_dir_all(&home);
            let crash_log = home.join("crash.log");
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::CRASH);
    }));
}

/// Open the file-backed ledger with the activity log attached.
fn open_ledger(config: &Config) -> Result<Ledger<FileAthleteStore>, Box<dyn std::error::Error>> {
    let store = FileAthleteStore::new()?;
    let mut ledger = Ledger::new(store, config.decay.clone());
    if let Some(path) = activity_log_path() {
        ledger = ledger.with_activity_log(ActivityLog::new(path));
    }
    Ok(ledger)
}

/// Open the file-backed challenge service over the same athlete store.
fn open_challenges(
    ledger: &Ledger<FileAthleteStore>,
) -> Result<Challenges<FileAthleteStore, FileChallengeStore>, Box<dyn std::error::Error>> {
    let mut challenges = Challenges::new(ledger.store().clone(), FileChallengeStore::new()?);
    if let Some(log) = ledger.activity_log() {
        challenges = challenges.with_activity_log(log.clone());
    }
    Ok(challenges)
}

/// Print formatted output if there is any.
fn emit(formatted: &str) {
    if !formatted.is_empty() {
        print!("{}", formatted);
        if !formatted.ends_with('\n') {
            println!();
        }
    }
}

/// Convert a success boolean to an exit code.
fn success_to_exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::from(exit_codes::SUCCESS as u8)
    } else {
        ExitCode::from(exit_codes::FAILURE as u8)
    }
}

/// Run a command and return the exit code.
fn run(command: Commands) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = Config::load();
    let ledger = open_ledger(&config)?;

    match command {
        Commands::Register { username, output } => {
            use fitlevel::cli::register::{RegisterCommand, RegisterOptions};

            let cmd = RegisterCommand::new(ledger);
            let options = RegisterOptions {
                json: output.json,
                quiet: output.quiet,
            };
            let result = cmd.run(&username);
            emit(&cmd.format_output(&result, &options));
            Ok(success_to_exit_code(result.success))
        }

        Commands::Log {
            athlete,
            workout,
            output,
        } => {
            use fitlevel::cli::log::{LogCommand, LogOptions};

            let record = workout.to_record()?;
            let cmd = LogCommand::new(ledger);
            let options = LogOptions {
                json: output.json,
                quiet: output.quiet,
            };
            let result = cmd.run(&athlete, record);
            emit(&cmd.format_output(&result, &options));
            Ok(success_to_exit_code(result.success))
        }

        Commands::Status { athlete, output } => {
            use fitlevel::cli::status::{StatusCommand, StatusOptions};

            let cmd = StatusCommand::new(ledger);
            let options = StatusOptions {
                json: output.json,
                quiet: output.quiet,
            };
            let result = cmd.run(&athlete);
            emit(&cmd.format_output(&result, &options));
            Ok(success_to_exit_code(result.success))
        }

        Commands::Workouts {
            athlete,
            limit,
            output,
        } => {
            use fitlevel::cli::workouts::{WorkoutsCommand, WorkoutsOptions};

            let cmd = WorkoutsCommand::new(ledger);
            let options = WorkoutsOptions {
                json: output.json,
                quiet: output.quiet,
                limit,
            };
            let result = cmd.run(&athlete, &options);
            emit(&cmd.format_output(&result, &options));
            Ok(success_to_exit_code(result.success))
        }

        Commands::Delete {
            athlete,
            workout_id,
            output,
        } => {
            use fitlevel::cli::delete::{DeleteCommand, DeleteOptions};

            let cmd = DeleteCommand::new(ledger);
            let options = DeleteOptions {
                json: output.json,
                quiet: output.quiet,
            };
            let result = cmd.run(&athlete, workout_id);
            emit(&cmd.format_output(&result, &options));
            Ok(success_to_exit_code(result.success))
        }

        Commands::Edit {
            athlete,
            workout_id,
            workout,
            output,
        } => {
            use fitlevel::cli::edit::{EditCommand, EditOptions};

            let record = workout.to_record()?;
            let cmd = EditCommand::new(ledger);
            let options = EditOptions {
                json: output.json,
                quiet: output.quiet,
            };
            let result = cmd.run(&athlete, workout_id, record);
            emit(&cmd.format_output(&result, &options));
            Ok(success_to_exit_code(result.success))
        }

        Commands::Clear {
            athlete,
            yes,
            output,
        } => {
            use fitlevel::cli::clear::{ClearCommand, ClearOptions};

            let cmd = ClearCommand::new(ledger);
            let options = ClearOptions {
                json: output.json,
                quiet: output.quiet,
                yes,
            };
            let result = cmd.run(&athlete, &options);
            emit(&cmd.format_output(&result, &options));
            Ok(success_to_exit_code(result.success))
        }

        Commands::Decay {
            athlete,
            force,
            warn_days,
            output,
        } => {
            use fitlevel::cli::decay::{DecayCommand, DecayOptions};

            let cmd = DecayCommand::new(ledger, config.sweep.clone());
            let options = DecayOptions {
                json: output.json,
                quiet: output.quiet,
                force,
                athlete,
                warn_days,
            };
            let result = cmd.run(&options);
            emit(&cmd.format_output(&result, &options));
            Ok(success_to_exit_code(result.success))
        }

        Commands::Relevel { output } => {
            use fitlevel::cli::relevel::{RelevelCommand, RelevelOptions};

            let cmd = RelevelCommand::new(ledger);
            let options = RelevelOptions {
                json: output.json,
                quiet: output.quiet,
            };
            let result = cmd.run();
            emit(&cmd.format_output(&result, &options));
            Ok(success_to_exit_code(result.success))
        }

        Commands::History {
            athlete,
            limit,
            output,
        } => {
            use fitlevel::cli::history::{HistoryCommand, HistoryOptions};

            let cmd = HistoryCommand::new(ledger);
            let options = HistoryOptions {
                json: output.json,
                quiet: output.quiet,
                limit,
            };
            let result = cmd.run(&athlete, &options);
            emit(&cmd.format_output(&result, &options));
            Ok(success_to_exit_code(result.success))
        }

        Commands::Challenge { action } => {
            use fitlevel::cli::challenge::{ChallengeCommand, ChallengeOptions};

            let (action, output) = action.into_action();
            let cmd = ChallengeCommand::new(open_challenges(&ledger)?);
            let options = ChallengeOptions {
                json: output.json,
                quiet: output.quiet,
            };
            let result = cmd.run(&action);
            emit(&cmd.format_output(&result, &options));
            Ok(success_to_exit_code(result.success))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
