//! CLI commands for fitlevel.
//!
//! This module provides CLI commands, organized into:
//! - **Athlete commands**: register, status, history, challenge
//! - **Workout commands**: log, workouts, delete, edit, clear
//! - **Maintenance commands**: decay, relevel
//!
//! Every command follows the same shape: an `XOptions` struct carrying the
//! `--json`/`--quiet` flags, an `XOutput` that serializes as the JSON
//! response, and an `XCommand` wrapping a [`Ledger`](crate::engine::Ledger)
//! or, for challenges, [`Challenges`](crate::engine::Challenges).

pub mod input;

// Athlete commands
pub mod challenge;
pub mod history;
pub mod register;
pub mod status;

// Workout commands
pub mod clear;
pub mod delete;
pub mod edit;
pub mod log;
pub mod workouts;

// Maintenance commands
pub mod decay;
pub mod relevel;

pub use challenge::ChallengeCommand;
pub use clear::ClearCommand;
pub use decay::DecayCommand;
pub use delete::DeleteCommand;
pub use edit::EditCommand;
pub use history::HistoryCommand;
pub use input::WorkoutInput;
pub use log::LogCommand;
pub use register::RegisterCommand;
pub use relevel::RelevelCommand;
pub use status::StatusCommand;
pub use workouts::WorkoutsCommand;

use serde::Serialize;

/// Render a command output.
///
/// Quiet wins over JSON; JSON falls back to `{}` if serialization fails.
pub(crate) fn render<T: Serialize>(
    output: &T,
    json: bool,
    quiet: bool,
    human: impl FnOnce(&T) -> String,
) -> String {
    if quiet {
        return String::new();
    }

    if json {
        serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
    } else {
        human(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        success: bool,
    }

    #[test]
    fn test_render_modes() {
        let sample = Sample { success: true };

        assert_eq!(render(&sample, true, true, |_| "text".into()), "");
        assert!(render(&sample, true, false, |_| "text".into()).contains("\"success\": true"));
        assert_eq!(render(&sample, false, false, |_| "text".into()), "text");
    }
}
