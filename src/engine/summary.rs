//! Rolling weekly summary of logged workouts.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::core::LoggedWorkout;

/// Length of the summary window in days.
pub const SUMMARY_WINDOW_DAYS: i64 = 7;

/// XP and workout count over the last week.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySummary {
    pub total_xp: u64,
    pub workout_count: usize,
}

/// Summarize workouts logged in the 7 days up to `now`.
///
/// The cutoff is inclusive: a workout logged exactly 7 days ago counts.
/// Workouts stamped after `now` are ignored.
pub fn weekly_summary(workouts: &[LoggedWorkout], now: DateTime<Utc>) -> WeeklySummary {
    let cutoff = now - Duration::days(SUMMARY_WINDOW_DAYS);

    workouts
        .iter()
        .filter(|w| w.logged_at >= cutoff && w.logged_at <= now)
        .fold(WeeklySummary::default(), |mut summary, w| {
            summary.total_xp = summary.total_xp.saturating_add(w.xp_earned);
            summary.workout_count += 1;
            summary
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{WorkoutRecord, WorkoutType};

    fn logged(xp: u64, at: DateTime<Utc>) -> LoggedWorkout {
        LoggedWorkout {
            id: 1,
            record: WorkoutRecord::new(WorkoutType::Cardio, "Run", 30, 5),
            xp_earned: xp,
            logged_at: at,
        }
    }

    #[test]
    fn test_empty() {
        assert_eq!(weekly_summary(&[], Utc::now()), WeeklySummary::default());
    }

    #[test]
    fn test_window_boundaries() {
        let now = Utc::now();
        let workouts = vec![
            logged(100, now),
            logged(200, now - Duration::days(3)),
            logged(300, now - Duration::days(7)),
            logged(400, now - Duration::days(7) - Duration::seconds(1)),
            logged(500, now + Duration::hours(1)),
        ];

        let summary = weekly_summary(&workouts, now);
        assert_eq!(summary.total_xp, 600);
        assert_eq!(summary.workout_count, 3);
    }
}
