//! Configuration loading for fitlevel.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.fitlevel/config.toml`)
//! 3. User config (`$FITLEVEL_HOME/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. The system runs with sensible defaults
//! when no config exists.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{FitError, Result};
use crate::util::read_to_string_limited;

/// Main configuration struct for fitlevel.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Inactivity decay defaults for newly registered athletes.
    pub decay: DecayConfig,
    /// Decay sweep scheduling.
    pub sweep: SweepConfig,
}

/// Inactivity decay defaults.
///
/// These seed the per-athlete decay settings at registration time. Existing
/// athletes keep the settings stored on their record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DecayConfig {
    /// Fraction of XP lost per day once the grace window has passed.
    pub rate_per_day: f64,
    /// Days after the last workout before decay begins.
    pub grace_days: u32,
}

/// Default decay rate: 5% per day.
pub const DEFAULT_DECAY_RATE: f64 = 0.05;

/// Default grace window in days.
pub const DEFAULT_GRACE_DAYS: u32 = 3;

impl DecayConfig {
    /// Check if a decay rate is valid (finite and in `[0.0, 1.0)`).
    pub fn is_valid_rate(value: f64) -> bool {
        value.is_finite() && (0.0..1.0).contains(&value)
    }
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            rate_per_day: DEFAULT_DECAY_RATE,
            grace_days: DEFAULT_GRACE_DAYS,
        }
    }
}

/// Decay sweep scheduling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SweepConfig {
    /// Minimum hours between two unforced sweeps.
    pub interval_hours: u32,
}

/// Minimum allowed sweep interval.
pub const MIN_INTERVAL_HOURS: u32 = 1;

impl SweepConfig {
    /// Check if an interval value is valid.
    pub fn is_valid_interval(value: u32) -> bool {
        value >= MIN_INTERVAL_HOURS
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self { interval_hours: 24 }
    }
}

/// One config file as written.
///
/// Every field is optional so a layer only overrides what it names, even
/// when it names a default value.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConfigLayer {
    pub decay: DecayLayer,
    pub sweep: SweepLayer,
}

/// The `[decay]` table of a config file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct DecayLayer {
    pub rate_per_day: Option<f64>,
    pub grace_days: Option<u32>,
}

/// The `[sweep]` table of a config file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct SweepLayer {
    pub interval_hours: Option<u32>,
}

impl Config {
    /// Load configuration with full precedence chain.
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        config
    }

    /// Load user config from `$FITLEVEL_HOME/config.toml`.
    fn load_user_config() -> Option<ConfigLayer> {
        let home = fitlevel_home()?;
        Self::load_optional(&home.join("config.toml"))
    }

    /// Load project config from `.fitlevel/config.toml` in the given directory.
    fn load_project_config(cwd: &Path) -> Option<ConfigLayer> {
        Self::load_optional(&cwd.join(".fitlevel").join("config.toml"))
    }

    /// Load a config layer that may legitimately be absent.
    ///
    /// A missing file is silent; an unreadable or malformed one is skipped
    /// with a warning.
    fn load_optional(path: &Path) -> Option<ConfigLayer> {
        if !path.exists() {
            return None;
        }
        match Self::load_layer(path) {
            Ok(layer) => Some(layer),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring config file");
                None
            }
        }
    }

    /// Parse one config file without filling in defaults.
    pub fn load_layer(path: &Path) -> Result<ConfigLayer> {
        let content = read_to_string_limited(path)?;
        toml::from_str(&content).map_err(|e| FitError::config(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        // FITLEVEL_DECAY_RATE
        if let Ok(val) = env::var("FITLEVEL_DECAY_RATE") {
            match val.parse::<f64>() {
                Ok(n) if DecayConfig::is_valid_rate(n) => self.decay.rate_per_day = n,
                Ok(n) => tracing::warn!(
                    "Invalid FITLEVEL_DECAY_RATE value '{}'. Must be in range [0.0, 1.0). \
                     Using '{}'.",
                    n,
                    self.decay.rate_per_day
                ),
                Err(_) => tracing::warn!(
                    "Invalid FITLEVEL_DECAY_RATE value '{}'. Expected a decimal number. \
                     Using '{}'.",
                    val,
                    self.decay.rate_per_day
                ),
            }
        }

        // FITLEVEL_DECAY_GRACE_DAYS
        if let Ok(val) = env::var("FITLEVEL_DECAY_GRACE_DAYS") {
            match val.parse::<u32>() {
                Ok(n) => self.decay.grace_days = n,
                Err(_) => tracing::warn!(
                    "Invalid FITLEVEL_DECAY_GRACE_DAYS value '{}'. \
                     Expected a non-negative integer. Using '{}'.",
                    val,
                    self.decay.grace_days
                ),
            }
        }

        // FITLEVEL_SWEEP_INTERVAL_HOURS
        if let Ok(val) = env::var("FITLEVEL_SWEEP_INTERVAL_HOURS") {
            match val.parse::<u32>() {
                Ok(n) if SweepConfig::is_valid_interval(n) => self.sweep.interval_hours = n,
                Ok(n) => tracing::warn!(
                    "Invalid FITLEVEL_SWEEP_INTERVAL_HOURS value '{}'. Must be >= {}. \
                     Using '{}'.",
                    n,
                    MIN_INTERVAL_HOURS,
                    self.sweep.interval_hours
                ),
                Err(_) => tracing::warn!(
                    "Invalid FITLEVEL_SWEEP_INTERVAL_HOURS value '{}'. \
                     Expected a positive integer. Using '{}'.",
                    val,
                    self.sweep.interval_hours
                ),
            }
        }
    }

    /// Apply a config layer, field by field.
    ///
    /// Every value the layer sets wins, including one equal to the default.
    /// Out-of-range values are skipped with a warning.
    fn merge(mut self, layer: ConfigLayer) -> Self {
        if let Some(rate) = layer.decay.rate_per_day {
            if DecayConfig::is_valid_rate(rate) {
                self.decay.rate_per_day = rate;
            } else {
                tracing::warn!(
                    "Invalid decay.rate_per_day value '{}'. Must be in range [0.0, 1.0). \
                     Using '{}'.",
                    rate,
                    self.decay.rate_per_day
                );
            }
        }
        if let Some(days) = layer.decay.grace_days {
            self.decay.grace_days = days;
        }

        if let Some(hours) = layer.sweep.interval_hours {
            if SweepConfig::is_valid_interval(hours) {
                self.sweep.interval_hours = hours;
            } else {
                tracing::warn!(
                    "Invalid sweep.interval_hours value '{}'. Must be >= {}. Using '{}'.",
                    hours,
                    MIN_INTERVAL_HOURS,
                    self.sweep.interval_hours
                );
            }
        }

        self
    }
}

/// Get the fitlevel home directory.
///
/// Checks `FITLEVEL_HOME` first, then falls back to `~/.fitlevel`. An empty
/// `FITLEVEL_HOME` is ignored.
pub fn fitlevel_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("FITLEVEL_HOME") {
        if home.is_empty() {
            tracing::warn!("FITLEVEL_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("FITLEVEL_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    dirs::home_dir().map(|home| home.join(".fitlevel"))
}

/// Directory holding one JSON record per athlete.
///
/// Returns `<fitlevel_home>/athletes/`.
pub fn athletes_dir() -> Option<PathBuf> {
    fitlevel_home().map(|h| h.join("athletes"))
}

/// Directory holding one JSON record per challenge.
///
/// Returns `<fitlevel_home>/challenges/`.
pub fn challenges_dir() -> Option<PathBuf> {
    fitlevel_home().map(|h| h.join("challenges"))
}

/// Path of the append-only activity log.
///
/// Returns `<fitlevel_home>/activity.log`.
pub fn activity_log_path() -> Option<PathBuf> {
    fitlevel_home().map(|h| h.join("activity.log"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!((config.decay.rate_per_day - 0.05).abs() < f64::EPSILON);
        assert_eq!(config.decay.grace_days, 3);
        assert_eq!(config.sweep.interval_hours, 24);
    }

    #[test]
    fn test_load_layer_over_defaults() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");

        let toml_content = r#"
[decay]
rate_per_day = 0.1
grace_days = 5
"#;
        fs::write(&config_path, toml_content).unwrap();

        let config = Config::default().merge(Config::load_layer(&config_path).unwrap());

        assert!((config.decay.rate_per_day - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.decay.grace_days, 5);
        // Untouched section keeps defaults
        assert_eq!(config.sweep.interval_hours, 24);
    }

    #[test]
    fn test_load_layer_missing() {
        let result = Config::load_layer(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_layer_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "this is not valid toml [[[").unwrap();

        let result = Config::load_layer(&config_path);
        assert!(matches!(result, Err(FitError::Config { .. })));
    }

    #[test]
    #[serial]
    fn test_project_config_precedence() {
        let home = TempDir::new().unwrap();
        env::set_var("FITLEVEL_HOME", home.path());

        let dir = TempDir::new().unwrap();
        let project_dir = dir.path().join(".fitlevel");
        fs::create_dir_all(&project_dir).unwrap();
        fs::write(
            project_dir.join("config.toml"),
            "[decay]\ngrace_days = 7\n",
        )
        .unwrap();

        let config = Config::load_from_cwd(dir.path());

        assert_eq!(config.decay.grace_days, 7);
        assert!((config.decay.rate_per_day - DEFAULT_DECAY_RATE).abs() < f64::EPSILON);

        env::remove_var("FITLEVEL_HOME");
    }

    #[test]
    #[serial]
    fn test_user_then_project_layering() {
        let home = TempDir::new().unwrap();
        fs::write(
            home.path().join("config.toml"),
            "[decay]\nrate_per_day = 0.2\ngrace_days = 10\n",
        )
        .unwrap();
        env::set_var("FITLEVEL_HOME", home.path());

        let dir = TempDir::new().unwrap();
        let project_dir = dir.path().join(".fitlevel");
        fs::create_dir_all(&project_dir).unwrap();
        fs::write(project_dir.join("config.toml"), "[decay]\ngrace_days = 1\n").unwrap();

        let config = Config::load_from_cwd(dir.path());

        // Rate from the user layer, grace from the project layer
        assert!((config.decay.rate_per_day - 0.2).abs() < f64::EPSILON);
        assert_eq!(config.decay.grace_days, 1);

        env::remove_var("FITLEVEL_HOME");
    }

    #[test]
    #[serial]
    fn test_env_var_precedence() {
        let home = TempDir::new().unwrap();
        env::set_var("FITLEVEL_HOME", home.path());

        let dir = TempDir::new().unwrap();
        let project_dir = dir.path().join(".fitlevel");
        fs::create_dir_all(&project_dir).unwrap();
        fs::write(project_dir.join("config.toml"), "[decay]\ngrace_days = 7\n").unwrap();

        env::set_var("FITLEVEL_DECAY_GRACE_DAYS", "14");

        let config = Config::load_from_cwd(dir.path());
        assert_eq!(config.decay.grace_days, 14);

        env::remove_var("FITLEVEL_DECAY_GRACE_DAYS");
        env::remove_var("FITLEVEL_HOME");
    }

    #[test]
    #[serial]
    fn test_env_var_overrides() {
        env::set_var("FITLEVEL_DECAY_RATE", "0.15");
        env::set_var("FITLEVEL_DECAY_GRACE_DAYS", "2");
        env::set_var("FITLEVEL_SWEEP_INTERVAL_HOURS", "6");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert!((config.decay.rate_per_day - 0.15).abs() < f64::EPSILON);
        assert_eq!(config.decay.grace_days, 2);
        assert_eq!(config.sweep.interval_hours, 6);

        env::remove_var("FITLEVEL_DECAY_RATE");
        env::remove_var("FITLEVEL_DECAY_GRACE_DAYS");
        env::remove_var("FITLEVEL_SWEEP_INTERVAL_HOURS");
    }

    #[test]
    #[serial]
    fn test_env_var_invalid_rate_ignored() {
        env::set_var("FITLEVEL_DECAY_RATE", "1.5");
        let mut config = Config::default();
        config.apply_env_overrides();
        assert!((config.decay.rate_per_day - DEFAULT_DECAY_RATE).abs() < f64::EPSILON);

        env::set_var("FITLEVEL_DECAY_RATE", "fast");
        let mut config = Config::default();
        config.apply_env_overrides();
        assert!((config.decay.rate_per_day - DEFAULT_DECAY_RATE).abs() < f64::EPSILON);

        env::remove_var("FITLEVEL_DECAY_RATE");
    }

    #[test]
    #[serial]
    fn test_env_var_invalid_interval_ignored() {
        env::set_var("FITLEVEL_SWEEP_INTERVAL_HOURS", "0");
        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.sweep.interval_hours, 24);

        env::remove_var("FITLEVEL_SWEEP_INTERVAL_HOURS");
    }

    #[test]
    fn test_is_valid_rate() {
        assert!(DecayConfig::is_valid_rate(0.0));
        assert!(DecayConfig::is_valid_rate(0.05));
        assert!(DecayConfig::is_valid_rate(0.999));

        assert!(!DecayConfig::is_valid_rate(1.0));
        assert!(!DecayConfig::is_valid_rate(-0.1));
        assert!(!DecayConfig::is_valid_rate(f64::NAN));
        assert!(!DecayConfig::is_valid_rate(f64::INFINITY));
    }

    #[test]
    fn test_merge_ignores_invalid_file_values() {
        let layer: ConfigLayer = toml::from_str(
            "[decay]\nrate_per_day = 2.0\ngrace_days = 9\n[sweep]\ninterval_hours = 0\n",
        )
        .unwrap();

        let merged = Config::default().merge(layer);

        assert!((merged.decay.rate_per_day - DEFAULT_DECAY_RATE).abs() < f64::EPSILON);
        assert_eq!(merged.decay.grace_days, 9);
        assert_eq!(merged.sweep.interval_hours, 24);
    }

    #[test]
    fn test_layer_can_restore_default_value() {
        let user: ConfigLayer =
            toml::from_str("[decay]\nrate_per_day = 0.1\ngrace_days = 5\n").unwrap();
        let project: ConfigLayer =
            toml::from_str("[decay]\nrate_per_day = 0.05\n[sweep]\ninterval_hours = 24\n")
                .unwrap();

        let merged = Config::default().merge(user).merge(project);

        assert!((merged.decay.rate_per_day - 0.05).abs() < f64::EPSILON);
        assert_eq!(merged.decay.grace_days, 5);
        assert_eq!(merged.sweep.interval_hours, 24);
    }

    #[test]
    fn test_empty_layer_changes_nothing() {
        let base = Config {
            decay: DecayConfig {
                rate_per_day: 0.2,
                grace_days: 1,
            },
            sweep: SweepConfig { interval_hours: 6 },
        };
        let layer: ConfigLayer = toml::from_str("").unwrap();

        assert_eq!(base.clone().merge(layer), base);
    }

    #[test]
    #[serial]
    fn test_project_restores_default_over_user() {
        let home = TempDir::new().unwrap();
        fs::write(
            home.path().join("config.toml"),
            "[decay]\nrate_per_day = 0.1\n",
        )
        .unwrap();
        env::set_var("FITLEVEL_HOME", home.path());

        let dir = TempDir::new().unwrap();
        let project_dir = dir.path().join(".fitlevel");
        fs::create_dir_all(&project_dir).unwrap();
        fs::write(project_dir.join("config.toml"), "[decay]\nrate_per_day = 0.05\n").unwrap();

        let config = Config::load_from_cwd(dir.path());
        assert!((config.decay.rate_per_day - 0.05).abs() < f64::EPSILON);

        env::remove_var("FITLEVEL_HOME");
    }

    #[test]
    #[serial]
    fn test_fitlevel_home_with_env() {
        let dir = TempDir::new().unwrap();
        env::set_var("FITLEVEL_HOME", dir.path());

        assert_eq!(fitlevel_home(), Some(dir.path().to_path_buf()));
        assert_eq!(athletes_dir(), Some(dir.path().join("athletes")));
        assert_eq!(challenges_dir(), Some(dir.path().join("challenges")));
        assert_eq!(activity_log_path(), Some(dir.path().join("activity.log")));

        env::remove_var("FITLEVEL_HOME");
    }

    #[test]
    #[serial]
    fn test_fitlevel_home_empty_env() {
        env::set_var("FITLEVEL_HOME", "");
        let home = fitlevel_home();
        if let Some(path) = home {
            assert!(path.ends_with(".fitlevel"));
        }
        env::remove_var("FITLEVEL_HOME");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("[sweep]\ninterval_hours = 12\n").unwrap();
        assert_eq!(config.sweep.interval_hours, 12);
        assert_eq!(config.decay, DecayConfig::default());
    }
}
