//! Leveling engine.
//!
//! Pure functions mapping an accumulated experience total to a level, a
//! level's XP thresholds, and fractional progress toward the next level.
//! Nothing here performs I/O; the stored `level` column is only ever a cache
//! of [`LevelCurve::level_from_xp`].
//!
//! # Example
//!
//! ```rust
//! use hearth_core::leveling::LevelCurve;
//!
//! let curve = LevelCurve::linear(100).unwrap();
//! assert_eq!(curve.cumulative_xp_for_level(3).unwrap(), 300);
//! assert_eq!(curve.level_from_xp(299), 2);
//! assert_eq!(curve.level_from_xp(300), 3);
//! ```

mod curve;
mod rewards;

#[cfg(test)]
mod tests;

pub use curve::{
    DEFAULT_BASE_XP, LevelCurve, LevelProgress, LevelingError, level_from_stored, xp_from_stored,
};
pub use rewards::{
    NEUTRAL_COLOR, REWARD_TIERS, RewardTier, color_for_level, tier_for_level, title_for_level,
};
use serde::Serialize;

use crate::config::{CurveKind, LevelingConfig};

impl LevelCurve {
    /// Builds the curve selected in `[leveling]`.
    ///
    /// # Errors
    ///
    /// Returns [`LevelingError::InvalidCurve`] for a zero base or an
    /// exponential factor below 2.
    pub fn from_config(config: &LevelingConfig) -> Result<Self, LevelingError> {
        match config.curve {
            CurveKind::Linear => Self::linear(config.base_xp),
            CurveKind::Quadratic => Self::quadratic(config.base_xp),
            CurveKind::Exponential => Self::exponential(config.base_xp, config.growth_factor),
        }
    }
}

/// Display fields derived from a user's XP total.
///
/// This is what read paths attach to a user record. It is computed on every
/// call and never cached by the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProgress {
    /// Total XP the values were derived from.
    pub experience_points: u64,
    /// Level and progress-bar data.
    #[serde(flatten)]
    pub progress: LevelProgress,
    /// Reward title, if the level has earned one.
    pub title: Option<&'static str>,
    /// Reward color.
    pub color: &'static str,
}

impl UserProgress {
    /// Derives every display field for `xp`.
    #[must_use]
    pub fn from_xp(curve: &LevelCurve, xp: u64) -> Self {
        let progress = curve.progress_to_next_level(xp);
        Self {
            experience_points: xp,
            title: title_for_level(progress.level),
            color: color_for_level(progress.level),
            progress,
        }
    }
}
