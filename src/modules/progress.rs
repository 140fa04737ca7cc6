use std::fmt;

use crate::modules::types::PlayerStats;

pub const MAX_LEVEL: u32 = 40;

/// Extra experience folded into each level's bracket, indexed by `level - 1`.
const LEVEL_XP_DIFF: [u64; MAX_LEVEL as usize] = [
    0, 1_000, 2_000, 3_000, 4_000, 5_000, 6_000, 7_000, 8_000, 9_000, //
    10_000, 10_000, 10_000, 10_000, 15_000, 20_000, 20_000, 20_000, 25_000, 25_000, //
    50_000, 75_000, 100_000, 125_000, 150_000, 190_000, 200_000, 250_000, 300_000, 350_000, //
    500_000, 500_000, 750_000, 1_000_000, 1_250_000, 1_500_000, 2_000_000, 2_500_000, 1_000_000,
    1_000_000,
];

/// Zero outside 1..=40.
pub fn xp_diff(level: u32) -> u64 {
    match level {
        1..=MAX_LEVEL => LEVEL_XP_DIFF[(level - 1) as usize],
        _ => 0,
    }
}

/// Experience earned within the current level against what the level needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelProgress {
    pub level: u32,
    pub earned: u64,
    pub needed: u64,
}

impl LevelProgress {
    pub fn from_stats(stats: &PlayerStats) -> Self {
        let floor = stats.prev_level_xp.saturating_add(xp_diff(stats.level));
        Self {
            level: stats.level,
            earned: stats.experience.saturating_sub(floor),
            needed: stats.next_level_xp.saturating_sub(floor),
        }
    }
}

impl fmt::Display for LevelProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "level {} ({} / {} XP)",
            self.level, self.earned, self.needed
        )
    }
}
