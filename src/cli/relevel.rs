//! Relevel command for fitlevel.
//!
//! Re-derives every athlete's level from stored XP and rewrites records
//! whose stored level disagrees.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::render;
use crate::engine::{Ledger, RelevelReport};
use crate::storage::AthleteStore;

/// Options for the relevel command.
#[derive(Debug, Clone, Default)]
pub struct RelevelOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the relevel command.
#[derive(Debug, Clone, Serialize)]
pub struct RelevelOutput {
    pub success: bool,
    #[serde(flatten)]
    pub report: RelevelReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The relevel command implementation.
pub struct RelevelCommand<S: AthleteStore> {
    ledger: Ledger<S>,
}

impl<S: AthleteStore> RelevelCommand<S> {
    /// Create a new relevel command.
    pub fn new(ledger: Ledger<S>) -> Self {
        Self { ledger }
    }

    /// Run the relevel command.
    pub fn run(&self) -> RelevelOutput {
        self.run_at(Utc::now())
    }

    /// Run the relevel command at a given time.
    pub fn run_at(&self, now: DateTime<Utc>) -> RelevelOutput {
        match self.ledger.relevel_all(now) {
            Ok(report) => RelevelOutput {
                success: report.failed.is_empty(),
                report,
                error: None,
            },
            Err(e) => RelevelOutput {
                success: false,
                report: RelevelReport::default(),
                error: Some(e.to_string()),
            },
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &RelevelOutput, options: &RelevelOptions) -> String {
        render(output, options.json, options.quiet, |o| {
            if let Some(error) = &o.error {
                return format!("Relevel failed: {}\n", error);
            }

            let report = &o.report;
            let mut text = format!(
                "Checked {} athlete(s), repaired {}.\n",
                report.checked,
                report.repaired.len()
            );
            for r in &report.repaired {
                text.push_str(&format!(
                    "  {}: level {} -> {}\n",
                    r.athlete_id, r.level_change.from, r.level_change.to
                ));
            }
            for f in &report.failed {
                text.push_str(&format!("  {}: failed ({})\n", f.athlete_id, f.error));
            }
            text
        })
    }
}
