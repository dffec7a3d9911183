//! Decay command for fitlevel.
//!
//! Runs the inactivity decay sweep over every athlete, or decays a single
//! athlete. Sweeps are throttled by `[sweep] interval_hours` unless forced.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::render;
use crate::config::SweepConfig;
use crate::engine::{
    decay_warnings, should_run_decay_sweep, DecayWarning, DecayedAthlete, Ledger, SweepFailure,
    SweepReport,
};
use crate::error::{FailOpen, Result};
use crate::storage::AthleteStore;

/// Options for the decay command.
#[derive(Debug, Clone, Default)]
pub struct DecayOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Ignore the sweep throttle.
    pub force: bool,
    /// Decay only this athlete.
    pub athlete: Option<String>,
    /// Also list athletes whose grace window ends within this many days.
    pub warn_days: Option<u32>,
}

/// Output format for the decay command.
#[derive(Debug, Clone, Serialize)]
pub struct DecayOutput {
    pub success: bool,
    /// False when the throttle skipped the sweep.
    pub ran: bool,
    /// Athletes evaluated.
    pub processed: usize,
    /// XP removed across all athletes.
    pub xp_lost: u64,
    pub decayed: Vec<DecayedAthlete>,
    pub failed: Vec<SweepFailure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<DecayWarning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DecayOutput {
    fn empty(ran: bool) -> Self {
        Self {
            success: true,
            ran,
            processed: 0,
            xp_lost: 0,
            decayed: Vec::new(),
            failed: Vec::new(),
            warnings: Vec::new(),
            error: None,
        }
    }

    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::empty(false)
        }
    }
}

impl From<SweepReport> for DecayOutput {
    fn from(report: SweepReport) -> Self {
        Self {
            xp_lost: report.total_xp_lost(),
            processed: report.processed,
            decayed: report.decayed,
            failed: report.failed,
            ..Self::empty(true)
        }
    }
}

/// The decay command implementation.
pub struct DecayCommand<S: AthleteStore> {
    ledger: Ledger<S>,
    sweep: SweepConfig,
}

impl<S: AthleteStore> DecayCommand<S> {
    /// Create a new decay command.
    pub fn new(ledger: Ledger<S>, sweep: SweepConfig) -> Self {
        Self { ledger, sweep }
    }

    /// Run the decay command.
    pub fn run(&self, options: &DecayOptions) -> DecayOutput {
        self.run_at(options, Utc::now())
    }

    /// Run the decay command as of `now`.
    pub fn run_at(&self, options: &DecayOptions, now: DateTime<Utc>) -> DecayOutput {
        let mut output = match self.apply(options, now) {
            Ok(output) => output,
            Err(e) => return DecayOutput::failure(e.to_string()),
        };

        if let Some(days) = options.warn_days {
            output.warnings = decay_warnings(self.ledger.store(), now, days)
                .fail_open_default("collecting decay warnings");
        }

        output
    }

    fn apply(&self, options: &DecayOptions, now: DateTime<Utc>) -> Result<DecayOutput> {
        if let Some(athlete) = &options.athlete {
            let report = SweepReport {
                processed: 1,
                decayed: self.ledger.apply_decay(athlete, now)?.into_iter().collect(),
                failed: Vec::new(),
            };
            return Ok(report.into());
        }

        if !options.force && !self.sweep_due(now) {
            tracing::debug!(
                interval_hours = self.sweep.interval_hours,
                "decay sweep throttled"
            );
            return Ok(DecayOutput::empty(false));
        }

        Ok(self.ledger.run_decay_sweep(now)?.into())
    }

    /// Whether the throttle allows an unforced sweep.
    ///
    /// Fails closed: an extra sweep removes XP, so when the last sweep time
    /// cannot be read the sweep is skipped until `--force`.
    fn sweep_due(&self, now: DateTime<Utc>) -> bool {
        // Without an activity log there is no record of past sweeps.
        let Some(log) = self.ledger.activity_log() else {
            return should_run_decay_sweep(None, now, self.sweep.interval_hours);
        };

        match log.last_sweep_at() {
            Ok(last_sweep) => should_run_decay_sweep(last_sweep, now, self.sweep.interval_hours),
            Err(e) => {
                tracing::warn!(
                    path = %log.path().display(),
                    error = %e,
                    "cannot read last sweep time; skipping decay sweep"
                );
                false
            }
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &DecayOutput, options: &DecayOptions) -> String {
        render(output, options.json, options.quiet, |o| {
            if !o.success {
                return format!(
                    "Decay failed: {}\n",
                    o.error.as_deref().unwrap_or("unknown error")
                );
            }

            let mut text = if o.ran {
                format!(
                    "Checked {} athlete(s), {} lost {} XP in total.\n",
                    o.processed,
                    o.decayed.len(),
                    o.xp_lost
                )
            } else {
                format!(
                    "Decay sweep skipped: last sweep was less than {} hour(s) ago or could not be read (use --force).\n",
                    self.sweep.interval_hours
                )
            };
            for d in &o.decayed {
                text.push_str(&format!(
                    "  {}: -{} XP after {} day(s) inactive",
                    d.athlete_id, d.xp_lost, d.days_inactive
                ));
                if d.level_change.leveled_down() {
                    text.push_str(&format!(
                        " (level {} -> {})",
                        d.level_change.from, d.level_change.to
                    ));
                }
                text.push('\n');
            }
            for f in &o.failed {
                text.push_str(&format!("  {}: failed ({})\n", f.athlete_id, f.error));
            }
            for w in &o.warnings {
                text.push_str(&format!(
                    "  {}: decay starts in {} day(s)\n",
                    w.athlete_id, w.days_remaining
                ));
            }
            text
        })
    }
}
