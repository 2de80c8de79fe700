//! Cosmetic title and color banding by level.

use serde::Serialize;

/// Color used below the first reward tier.
pub const NEUTRAL_COLOR: &str = "#9ca3af";

/// A cosmetic band that starts at `min_level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RewardTier {
    /// First level that earns this tier.
    pub min_level: u64,
    /// Display title.
    pub title: &'static str,
    /// Display color (CSS hex).
    pub color: &'static str,
}

/// Reward tiers, sorted by `min_level` ascending.
pub static REWARD_TIERS: &[RewardTier] = &[
    RewardTier {
        min_level: 5,
        title: "Regular",
        color: "#22c55e",
    },
    RewardTier {
        min_level: 10,
        title: "Contributor",
        color: "#3b82f6",
    },
    RewardTier {
        min_level: 20,
        title: "Veteran",
        color: "#a855f7",
    },
    RewardTier {
        min_level: 35,
        title: "Elder",
        color: "#f59e0b",
    },
    RewardTier {
        min_level: 50,
        title: "Legend",
        color: "#ef4444",
    },
];

/// The highest tier whose threshold `level` has reached.
#[must_use]
pub fn tier_for_level(level: u64) -> Option<&'static RewardTier> {
    let reached = REWARD_TIERS.partition_point(|tier| tier.min_level <= level);
    reached.checked_sub(1).map(|idx| &REWARD_TIERS[idx])
}

/// Title for `level`, `None` below the first tier.
#[must_use]
pub fn title_for_level(level: u64) -> Option<&'static str> {
    tier_for_level(level).map(|tier| tier.title)
}

/// Color for `level`, [`NEUTRAL_COLOR`] below the first tier.
#[must_use]
pub fn color_for_level(level: u64) -> &'static str {
    tier_for_level(level).map_or(NEUTRAL_COLOR, |tier| tier.color)
}
