//! File-based athlete and challenge storage.
//!
//! Athletes are stored as JSON files in `$FITLEVEL_HOME/athletes/`,
//! challenges in `$FITLEVEL_HOME/challenges/`. Atomic writes are achieved
//! via temp file + rename pattern.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{athletes_dir, challenges_dir};
use crate::core::{normalize_athlete_id, AthleteRecord, Challenge};
use crate::error::{FitError, Result};
use crate::storage::{AthleteStore, ChallengeStore};
use crate::util::read_to_string_limited;

/// Create `dir` if it does not exist yet.
fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| FitError::storage(dir, e))?;
    }
    Ok(())
}

/// Write `value` as JSON using temp file + fsync + rename.
fn write_json_atomic<T: Serialize>(final_path: &Path, temp_path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;

    {
        let mut file = fs::File::create(temp_path).map_err(|e| FitError::storage(temp_path, e))?;
        file.write_all(json.as_bytes())
            .map_err(|e| FitError::storage(temp_path, e))?;
        file.sync_all()
            .map_err(|e| FitError::storage(temp_path, e))?;
    }

    fs::rename(temp_path, final_path).map_err(|e| FitError::storage(final_path, e))?;

    Ok(())
}

/// Stems of the JSON files in `dir`, skipping temp files and other entries.
fn json_stems(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir).map_err(|e| FitError::storage(dir, e))?;

    let mut stems = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| FitError::storage(dir, e))?;
        let path = entry.path();

        if path.extension().map(|e| e != "json").unwrap_or(true) {
            continue;
        }
        let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        if stem.starts_with('.') {
            continue;
        }
        stems.push((stem, path));
    }

    Ok(stems)
}

/// File-based athlete storage: one `<id>.json` per athlete.
#[derive(Debug, Clone)]
pub struct FileAthleteStore {
    athletes_dir: PathBuf,
}

impl FileAthleteStore {
    /// Create a store in the default directory.
    pub fn new() -> Result<Self> {
        let dir = athletes_dir().ok_or_else(|| {
            FitError::config("Could not determine athletes directory (no home directory)")
        })?;
        Self::with_dir(dir)
    }

    /// Create a store in a custom directory, creating it if needed.
    pub fn with_dir(athletes_dir: impl Into<PathBuf>) -> Result<Self> {
        let athletes_dir = athletes_dir.into();
        ensure_dir(&athletes_dir)?;
        Ok(Self { athletes_dir })
    }

    /// Path for an athlete file.
    ///
    /// IDs are normalized first so nothing outside the directory is reachable.
    fn athlete_path(&self, id: &str) -> Result<PathBuf> {
        let id = normalize_athlete_id(id)?;
        Ok(self.athletes_dir.join(format!("{}.json", id)))
    }

    fn temp_path(&self, id: &str) -> Result<PathBuf> {
        let id = normalize_athlete_id(id)?;
        Ok(self.athletes_dir.join(format!(".{}.json.tmp", id)))
    }
}

impl AthleteStore for FileAthleteStore {
    fn get(&self, id: &str) -> Result<Option<AthleteRecord>> {
        let id = normalize_athlete_id(id)?;
        let path = self.athlete_path(&id)?;

        if !path.exists() {
            return Ok(None);
        }

        let content = read_to_string_limited(&path)?;
        let athlete: AthleteRecord = serde_json::from_str(&content)
            .map_err(|e| FitError::serde(format!("{}: {}", path.display(), e)))?;

        // A record copied under another name would be written back over
        // the athlete it names.
        if athlete.id != id {
            return Err(FitError::serde(format!(
                "{}: record belongs to athlete '{}'",
                path.display(),
                athlete.id
            )));
        }

        Ok(Some(athlete))
    }

    fn put(&self, athlete: &AthleteRecord) -> Result<()> {
        write_json_atomic(
            &self.athlete_path(&athlete.id)?,
            &self.temp_path(&athlete.id)?,
            athlete,
        )
    }

    fn ids(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for (stem, path) in json_stems(&self.athletes_dir)? {
            // `get` could never reach a file whose name is not a normalized id
            match normalize_athlete_id(&stem) {
                Ok(id) if id == stem => ids.push(id),
                _ => tracing::warn!(path = %path.display(), "ignoring misnamed athlete file"),
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// File-based challenge storage: one `<id>.json` per challenge.
#[derive(Debug, Clone)]
pub struct FileChallengeStore {
    challenges_dir: PathBuf,
}

impl FileChallengeStore {
    /// Create a store in the default directory.
    pub fn new() -> Result<Self> {
        let dir = challenges_dir().ok_or_else(|| {
            FitError::config("Could not determine challenges directory (no home directory)")
        })?;
        Self::with_dir(dir)
    }

    /// Create a store in a custom directory, creating it if needed.
    pub fn with_dir(challenges_dir: impl Into<PathBuf>) -> Result<Self> {
        let challenges_dir = challenges_dir.into();
        ensure_dir(&challenges_dir)?;
        Ok(Self { challenges_dir })
    }

    fn challenge_path(&self, id: u64) -> PathBuf {
        self.challenges_dir.join(format!("{}.json", id))
    }
}

impl ChallengeStore for FileChallengeStore {
    fn get(&self, id: u64) -> Result<Option<Challenge>> {
        let path = self.challenge_path(id);

        if !path.exists() {
            return Ok(None);
        }

        let content = read_to_string_limited(&path)?;
        let challenge: Challenge = serde_json::from_str(&content)
            .map_err(|e| FitError::serde(format!("{}: {}", path.display(), e)))?;

        if challenge.id != id {
            return Err(FitError::serde(format!(
                "{}: record belongs to challenge {}",
                path.display(),
                challenge.id
            )));
        }

        Ok(Some(challenge))
    }

    fn put(&self, challenge: &Challenge) -> Result<()> {
        let temp_path = self
            .challenges_dir
            .join(format!(".{}.json.tmp", challenge.id));
        write_json_atomic(&self.challenge_path(challenge.id), &temp_path, challenge)
    }

    fn ids(&self) -> Result<Vec<u64>> {
        let mut ids = Vec::new();
        for (stem, path) in json_stems(&self.challenges_dir)? {
            match stem.parse::<u64>() {
                Ok(id) if id.to_string() == stem => ids.push(id),
                _ => tracing::warn!(path = %path.display(), "ignoring misnamed challenge file"),
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }
}
