//! Level curve, level lookup, progress and rank for cumulative XP.
//!
//! The curve is implicit: leaving level 1 costs [`BASE_COST`] XP, leaving
//! level 2 costs [`BASE_INCREMENT`], and every later level costs [`STEP`]
//! more than the one before (300, 400, 500, 600, ...). Nothing is stored;
//! every function walks the curve from level 1.
//!
//! All functions here are pure and total.

use std::fmt;

use serde::{Deserialize, Serialize};

/// XP needed to leave level 1.
pub const BASE_COST: u64 = 300;

/// XP needed to leave level 2.
pub const BASE_INCREMENT: u64 = 400;

/// Growth of the per-level cost after level 2.
pub const STEP: u64 = 100;

/// Lazy iterator over per-level XP costs.
///
/// The n-th item (starting at 0) is the XP needed to go from level `n + 1`
/// to level `n + 2`.
#[derive(Debug, Clone)]
pub struct LevelCurve {
    threshold: u64,
    increment: u64,
}

impl LevelCurve {
    /// Start the curve at level 1.
    pub fn new() -> Self {
        Self {
            threshold: BASE_COST,
            increment: BASE_INCREMENT,
        }
    }
}

impl Default for LevelCurve {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for LevelCurve {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let cost = self.threshold;
        self.threshold = self.increment;
        self.increment = self.increment.saturating_add(STEP);
        Some(cost)
    }
}

/// Derive the level for a cumulative XP total.
///
/// Always at least 1. Runs in O(level) steps since each level costs
/// strictly more than the previous one.
pub fn level_for_xp(xp: u64) -> u32 {
    let mut remaining = xp;
    let mut level: u32 = 1;

    for cost in LevelCurve::new() {
        if remaining < cost {
            break;
        }
        remaining -= cost;
        level = level.saturating_add(1);
    }

    level
}

/// XP cost of leaving `level` (level 1 costs [`BASE_COST`]).
///
/// Levels below 1 are treated as level 1.
pub fn level_cost(level: u32) -> u64 {
    let index = level.max(1) as usize - 1;
    LevelCurve::new().nth(index).unwrap_or(u64::MAX)
}

/// Cumulative XP at which `level` begins.
///
/// `xp_to_reach_level(1) == 0`, `xp_to_reach_level(2) == 300`,
/// `xp_to_reach_level(3) == 700`.
pub fn xp_to_reach_level(level: u32) -> u64 {
    let steps = level.max(1) as usize - 1;
    LevelCurve::new()
        .take(steps)
        .fold(0u64, |acc, cost| acc.saturating_add(cost))
}

/// XP still needed to reach `current_level + 1`.
///
/// Returns zero or a negative number when `current_level` is stale relative
/// to `cumulative_xp`; re-derive the level with [`level_for_xp`] first.
pub fn xp_required_for_next_level(cumulative_xp: u64, current_level: u32) -> i64 {
    let total_for_next = xp_to_reach_level(current_level.max(1).saturating_add(1));
    clamp_to_i64(total_for_next) - clamp_to_i64(cumulative_xp)
}

/// Progress through the current level, as a percentage in `[0, 100]`.
pub fn level_progress_percent(cumulative_xp: u64, current_level: u32) -> f64 {
    let level = current_level.max(1);

    if level == 1 {
        let percent = cumulative_xp as f64 / BASE_COST as f64 * 100.0;
        return percent.clamp(0.0, 100.0);
    }

    let level_start = xp_to_reach_level(level);
    let xp_in_level = cumulative_xp as f64 - level_start as f64;
    let percent = xp_in_level / level_cost(level) as f64 * 100.0;

    percent.clamp(0.0, 100.0)
}

fn clamp_to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Cosmetic rank derived from cumulative XP, independent of level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rank {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
    Master,
    Grandmaster,
    Elite,
    Legend,
    Mythic,
    #[serde(rename = "GOAT")]
    Goat,
}

impl Rank {
    /// Every rank in ascending order.
    pub const ALL: [Rank; 11] = [
        Rank::Bronze,
        Rank::Silver,
        Rank::Gold,
        Rank::Platinum,
        Rank::Diamond,
        Rank::Master,
        Rank::Grandmaster,
        Rank::Elite,
        Rank::Legend,
        Rank::Mythic,
        Rank::Goat,
    ];

    /// Minimum cumulative XP for this rank.
    pub fn min_xp(self) -> u64 {
        match self {
            Rank::Bronze => 0,
            Rank::Silver => 2_000,
            Rank::Gold => 5_000,
            Rank::Platinum => 10_000,
            Rank::Diamond => 20_000,
            Rank::Master => 35_000,
            Rank::Grandmaster => 55_000,
            Rank::Elite => 80_000,
            Rank::Legend => 110_000,
            Rank::Mythic => 150_000,
            Rank::Goat => 200_000,
        }
    }

    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            Rank::Bronze => "Bronze",
            Rank::Silver => "Silver",
            Rank::Gold => "Gold",
            Rank::Platinum => "Platinum",
            Rank::Diamond => "Diamond",
            Rank::Master => "Master",
            Rank::Grandmaster => "Grandmaster",
            Rank::Elite => "Elite",
            Rank::Legend => "Legend",
            Rank::Mythic => "Mythic",
            Rank::Goat => "GOAT",
        }
    }

    /// The next rank up, if any.
    pub fn next(self) -> Option<Rank> {
        let index = Rank::ALL.iter().position(|r| *r == self)?;
        Rank::ALL.get(index + 1).copied()
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Rank for a cumulative XP total.
pub fn rank_for_xp(xp: u64) -> Rank {
    Rank::ALL
        .iter()
        .rev()
        .copied()
        .find(|rank| xp >= rank.min_xp())
        .unwrap_or(Rank::Bronze)
}

/// Every display value derived from a cumulative XP total.
///
/// Built in one pass from XP alone, so its level can never be stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSnapshot {
    /// Cumulative XP.
    pub xp: u64,
    /// Level derived from `xp`.
    pub level: u32,
    /// Rank derived from `xp`.
    pub rank: Rank,
    /// Progress through the current level, in `[0, 100]`.
    pub progress_percent: f64,
    /// XP still needed for the next level (always positive).
    pub xp_to_next_level: u64,
}

impl LevelSnapshot {
    /// Derive a snapshot from cumulative XP.
    pub fn from_xp(xp: u64) -> Self {
        let level = level_for_xp(xp);
        let remaining = xp_required_for_next_level(xp, level);
        Self {
            xp,
            level,
            rank: rank_for_xp(xp),
            progress_percent: level_progress_percent(xp, level),
            xp_to_next_level: u64::try_from(remaining).unwrap_or(0),
        }
    }
}
