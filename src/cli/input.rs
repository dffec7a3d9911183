//! Workout input shared by the `log` and `edit` commands.
//!
//! Workouts arrive either as flags or as a JSON [`WorkoutRecord`] on stdin.

use std::io::Read;

use crate::core::{Exercise, ExerciseSet, WorkoutRecord, WorkoutType};
use crate::error::{FitError, Result};

/// Workout fields as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct WorkoutInput {
    /// `cardio`, `strength` or `flexibility`.
    pub workout_type: String,
    pub name: String,
    pub duration_minutes: u32,
    pub intensity: u8,
    pub distance_km: Option<f64>,
    pub subtype: Option<String>,
    pub notes: Option<String>,
    /// Exercise specs, see [`parse_exercise`].
    pub exercises: Vec<String>,
    /// Flat volume: sets and reps must be given together.
    pub sets: Option<u32>,
    pub reps: Option<u32>,
}

impl WorkoutInput {
    /// Build a workout record. Validation of ranges is left to the ledger.
    pub fn to_record(&self) -> Result<WorkoutRecord> {
        let workout_type = WorkoutType::parse(&self.workout_type).ok_or_else(|| {
            FitError::invalid_workout(format!(
                "unknown workout type '{}' (expected cardio, strength or flexibility)",
                self.workout_type
            ))
        })?;

        let mut record = WorkoutRecord::new(
            workout_type,
            self.name.trim(),
            self.duration_minutes,
            self.intensity,
        );
        if let Some(km) = self.distance_km {
            record = record.with_distance(km);
        }
        if let Some(subtype) = &self.subtype {
            record = record.with_subtype(subtype.trim());
        }
        if let Some(notes) = self.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            record = record.with_notes(notes);
        }

        for spec in &self.exercises {
            record = record.with_exercise(parse_exercise(spec)?);
        }

        match (self.sets, self.reps) {
            (Some(sets), Some(reps)) => record = record.with_legacy_volume(sets, reps),
            (None, None) => {}
            _ => {
                return Err(FitError::invalid_workout(
                    "--sets and --reps must be given together",
                ))
            }
        }

        Ok(record)
    }
}

/// Parse an exercise spec of the form `NAME:SET,SET,...`.
///
/// Each set is `REPS` or `REPSxKG`, e.g. `Bench Press:10x60,8x70` or
/// `Push-ups:20,15`.
pub fn parse_exercise(spec: &str) -> Result<Exercise> {
    let (name, sets) = spec
        .rsplit_once(':')
        .ok_or_else(|| FitError::invalid_workout(format!("exercise '{}' is missing ':'", spec)))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(FitError::invalid_workout(format!(
            "exercise '{}' has no name",
            spec
        )));
    }

    let sets = sets
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_set)
        .collect::<Result<Vec<_>>>()?;

    Ok(Exercise {
        name: name.to_string(),
        sets,
    })
}

fn parse_set(set: &str) -> Result<ExerciseSet> {
    let bad = || FitError::invalid_workout(format!("invalid set '{}' (expected REPS or REPSxKG)", set));

    match set.split_once(['x', 'X']) {
        Some((reps, weight)) => Ok(ExerciseSet {
            reps: reps.trim().parse().map_err(|_| bad())?,
            weight_kg: Some(weight.trim().parse().map_err(|_| bad())?),
        }),
        None => Ok(ExerciseSet {
            reps: set.parse().map_err(|_| bad())?,
            weight_kg: None,
        }),
    }
}

/// Read a JSON workout record.
pub fn read_workout_json(mut reader: impl Read) -> Result<WorkoutRecord> {
    let mut buffer = String::new();
    reader.read_to_string(&mut buffer)?;
    serde_json::from_str(&buffer)
        .map_err(|e| FitError::invalid_workout(format!("could not parse workout JSON: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(workout_type: &str) -> WorkoutInput {
        WorkoutInput {
            workout_type: workout_type.to_string(),
            name: " Leg day ".to_string(),
            duration_minutes: 45,
            intensity: 8,
            ..Default::default()
        }
    }

    #[test]
    fn test_to_record_basic() {
        let record = input("Strength").to_record().unwrap();
        assert_eq!(record.workout_type, WorkoutType::Strength);
        assert_eq!(record.name, "Leg day");
        assert_eq!(record.duration_minutes, 45);
        assert!(record.exercises.is_empty());
    }

    #[test]
    fn test_to_record_notes_and_subtype() {
        let mut i = input("strength");
        i.subtype = Some(" strength_push ".to_string());
        i.notes = Some("  felt strong ".to_string());
        let record = i.to_record().unwrap();
        assert_eq!(record.subtype.as_deref(), Some("strength_push"));
        assert_eq!(record.notes.as_deref(), Some("felt strong"));

        let mut blank = input("strength");
        blank.notes = Some("   ".to_string());
        assert!(blank.to_record().unwrap().notes.is_none());
    }

    #[test]
    fn test_to_record_unknown_type() {
        let result = input("swimming").to_record();
        assert!(matches!(result, Err(FitError::InvalidWorkout { .. })));
    }

    #[test]
    fn test_to_record_with_exercises_and_volume() {
        let mut i = input("strength");
        i.exercises = vec!["Squat:5x100,5x100".to_string(), "Lunge:12".to_string()];
        i.sets = Some(3);
        i.reps = Some(10);

        let record = i.to_record().unwrap();
        assert_eq!(record.exercises.len(), 2);
        assert_eq!(record.exercises[0].sets.len(), 2);
        assert_eq!(record.legacy_volume.map(|v| v.sets), Some(3));
    }

    #[test]
    fn test_to_record_unpaired_volume() {
        let mut i = input("strength");
        i.sets = Some(3);
        assert!(i.to_record().is_err());
    }

    #[test]
    fn test_parse_exercise() {
        let exercise = parse_exercise("Bench Press: 10x60, 8x72.5").unwrap();
        assert_eq!(exercise.name, "Bench Press");
        assert_eq!(
            exercise.sets,
            vec![
                ExerciseSet {
                    reps: 10,
                    weight_kg: Some(60.0)
                },
                ExerciseSet {
                    reps: 8,
                    weight_kg: Some(72.5)
                },
            ]
        );

        let bodyweight = parse_exercise("Push-ups:20,15").unwrap();
        assert_eq!(bodyweight.sets[1].weight_kg, None);
        assert_eq!(bodyweight.sets[1].reps, 15);
    }

    #[test]
    fn test_parse_exercise_errors() {
        assert!(parse_exercise("Squat").is_err());
        assert!(parse_exercise(":10").is_err());
        assert!(parse_exercise("Squat:tenx60").is_err());
        assert!(parse_exercise("Squat:10xheavy").is_err());
    }

    #[test]
    fn test_read_workout_json() {
        let json = r#"{"type": "cardio", "name": "Run", "duration_minutes": 30, "intensity": 6, "distance_km": 5.0}"#;
        let record = read_workout_json(json.as_bytes()).unwrap();
        assert_eq!(record.workout_type, WorkoutType::Cardio);
        assert_eq!(record.distance_km, Some(5.0));

        assert!(read_workout_json("not json".as_bytes()).is_err());
    }
}
