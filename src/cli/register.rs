//! Register command for fitlevel.
//!
//! Creates a new athlete at level 1 with the configured decay settings.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::render;
use crate::engine::Ledger;
use crate::storage::AthleteStore;

/// Options for the register command.
#[derive(Debug, Clone, Default)]
pub struct RegisterOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the register command.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterOutput {
    /// Whether the athlete was created.
    pub success: bool,
    /// Normalized athlete id.
    pub athlete_id: String,
    /// Username as entered.
    pub username: String,
    /// Decay settings the athlete starts with.
    pub decay_rate_per_day: f64,
    pub decay_grace_days: u32,
    /// Error message if registration failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RegisterOutput {
    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            athlete_id: String::new(),
            username: String::new(),
            decay_rate_per_day: 0.0,
            decay_grace_days: 0,
            error: Some(error.into()),
        }
    }
}

/// The register command implementation.
pub struct RegisterCommand<S: AthleteStore> {
    ledger: Ledger<S>,
}

impl<S: AthleteStore> RegisterCommand<S> {
    /// Create a new register command.
    pub fn new(ledger: Ledger<S>) -> Self {
        Self { ledger }
    }

    /// Run the register command.
    pub fn run(&self, username: &str) -> RegisterOutput {
        self.run_at(username, Utc::now())
    }

    /// Run the register command at a given time.
    pub fn run_at(&self, username: &str, now: DateTime<Utc>) -> RegisterOutput {
        match self.ledger.register(username, now) {
            Ok(athlete) => RegisterOutput {
                success: true,
                athlete_id: athlete.id,
                username: athlete.username,
                decay_rate_per_day: athlete.progress.decay_rate_per_day,
                decay_grace_days: athlete.progress.decay_grace_days,
                error: None,
            },
            Err(e) => RegisterOutput::failure(e.to_string()),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &RegisterOutput, options: &RegisterOptions) -> String {
        render(output, options.json, options.quiet, |o| {
            if o.success {
                format!(
                    "Registered {} ({}). Level 1, Bronze.\n",
                    o.username, o.athlete_id
                )
            } else {
                format!(
                    "Registration failed: {}\n",
                    o.error.as_deref().unwrap_or("unknown error")
                )
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecayConfig;
    use crate::storage::MemoryAthleteStore;

    fn command() -> RegisterCommand<MemoryAthleteStore> {
        RegisterCommand::new(Ledger::new(MemoryAthleteStore::new(), DecayConfig::default()))
    }

    #[test]
    fn test_register_success() {
        let cmd = command();
        let output = cmd.run("Ana");

        assert!(output.success);
        assert_eq!(output.athlete_id, "ana");
        assert_eq!(output.decay_grace_days, 3);

        let text = cmd.format_output(&output, &RegisterOptions::default());
        assert!(text.contains("Registered Ana (ana)"));
    }

    #[test]
    fn test_register_duplicate() {
        let cmd = command();
        cmd.run("ana");
        let output = cmd.run("ana");

        assert!(!output.success);
        assert!(output.error.unwrap().contains("already exists"));
    }

    #[test]
    fn test_register_json_output() {
        let cmd = command();
        let options = RegisterOptions {
            json: true,
            ..Default::default()
        };
        let output = cmd.run("ana");
        let json = cmd.format_output(&output, &options);

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["athlete_id"], "ana");
        assert!(parsed.get("error").is_none());
    }
}
