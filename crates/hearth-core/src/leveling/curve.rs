//! Threshold curves and the XP/level mapping built on them.
//!
//! Every curve defines the *incremental* cost of a level. The cumulative
//! threshold of level `L` is the sum of the incremental costs of levels
//! `1..L`, evaluated in closed form with checked `u128` arithmetic so that
//! lookups stay `O(log L)` even for XP totals near `u64::MAX`.

// Fractions are for progress bars; f64 precision loss on huge totals is fine.
#![allow(clippy::cast_precision_loss)]

use serde::Serialize;
use thiserror::Error;

/// Default `base` for the quadratic curve.
pub const DEFAULT_BASE_XP: u64 = 100;

/// Errors raised by the leveling engine.
///
/// These are programming errors (bad input to a pure function), not runtime
/// conditions. Callers must not clamp or coerce around them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum LevelingError {
    /// Levels start at 1.
    #[error("invalid level {level}: levels start at 1")]
    InvalidLevel {
        /// The rejected level.
        level: i64,
    },

    /// A stored XP total was negative.
    #[error("invalid experience total {xp}: must be non-negative")]
    NegativeXp {
        /// The rejected XP value.
        xp: i64,
    },

    /// The requested threshold does not fit in a `u64`.
    #[error("threshold for level {level} exceeds the representable XP range")]
    Overflow {
        /// The level whose threshold overflowed.
        level: u64,
    },

    /// A curve parameter is out of range.
    #[error("invalid curve: {reason}")]
    InvalidCurve {
        /// Why the curve was rejected.
        reason: String,
    },
}

/// The incremental XP cost of each level.
///
/// All shapes are strictly positive and non-decreasing in the level, which
/// keeps [`LevelCurve::level_from_xp`] total and monotonic. The shape is
/// private: a curve only exists once [`LevelCurve::linear`],
/// [`LevelCurve::quadratic`], [`LevelCurve::exponential`] or
/// [`LevelCurve::from_config`] has validated its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LevelCurve {
    shape: Shape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
enum Shape {
    /// `base * L`
    Linear { base: u64 },
    /// `base * L^2`
    Quadratic { base: u64 },
    /// `base * factor^(L - 1)`, `factor >= 2`
    Exponential { base: u64, factor: u64 },
}

impl Default for LevelCurve {
    fn default() -> Self {
        Self {
            shape: Shape::Quadratic {
                base: DEFAULT_BASE_XP,
            },
        }
    }
}

/// Where an XP total sits on the curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelProgress {
    /// Current level (`>= 1`).
    pub level: u64,
    /// Cumulative XP at which the current level starts.
    pub current_level_xp: u64,
    /// XP accumulated inside the current level.
    pub xp_into_level: u64,
    /// XP the current level costs in total. Saturates at `u64::MAX` for the
    /// last level representable in a `u64`.
    pub xp_for_next_level: u64,
    /// `xp_into_level / xp_for_next_level`, always in `[0, 1)`.
    pub fraction: f64,
}

impl LevelCurve {
    /// Linear curve. `base` must be at least 1.
    pub fn linear(base: u64) -> Result<Self, LevelingError> {
        check_base(base)?;
        Ok(Self {
            shape: Shape::Linear { base },
        })
    }

    /// Quadratic curve. `base` must be at least 1.
    pub fn quadratic(base: u64) -> Result<Self, LevelingError> {
        check_base(base)?;
        Ok(Self {
            shape: Shape::Quadratic { base },
        })
    }

    /// Exponential curve. `base` must be at least 1 and `factor` at least 2.
    pub fn exponential(base: u64, factor: u64) -> Result<Self, LevelingError> {
        check_base(base)?;
        if factor < 2 {
            return Err(LevelingError::InvalidCurve {
                reason: format!("exponential growth factor must be at least 2, got {factor}"),
            });
        }
        Ok(Self {
            shape: Shape::Exponential { base, factor },
        })
    }

    const fn base(&self) -> u64 {
        match self.shape {
            Shape::Linear { base } | Shape::Quadratic { base } | Shape::Exponential { base, .. } => {
                base
            },
        }
    }

    /// XP needed to advance from `level` to `level + 1`.
    ///
    /// # Errors
    ///
    /// [`LevelingError::InvalidLevel`] for level 0,
    /// [`LevelingError::Overflow`] if the cost does not fit in a `u64`.
    pub fn xp_required_for_level(&self, level: u64) -> Result<u64, LevelingError> {
        check_level(level)?;
        self.required_wide(level)
            .and_then(|xp| u64::try_from(xp).ok())
            .ok_or(LevelingError::Overflow { level })
    }

    /// Total XP needed, starting from zero, to reach the start of `level`.
    ///
    /// `cumulative_xp_for_level(1) == 0`.
    ///
    /// # Errors
    ///
    /// [`LevelingError::InvalidLevel`] for level 0,
    /// [`LevelingError::Overflow`] if the total does not fit in a `u64`.
    pub fn cumulative_xp_for_level(&self, level: u64) -> Result<u64, LevelingError> {
        check_level(level)?;
        self.cumulative_fit(level)
            .ok_or(LevelingError::Overflow { level })
    }

    /// Highest level whose cumulative threshold is `<= xp`.
    ///
    /// There is no level cap. A level whose threshold does not fit in a
    /// `u64` can never be reached, so the lookup is total.
    #[must_use]
    pub fn level_from_xp(&self, xp: u64) -> u64 {
        self.locate(xp).0
    }

    /// Progress-bar view of an XP total. Never touches stored state.
    #[must_use]
    pub fn progress_to_next_level(&self, xp: u64) -> LevelProgress {
        let (level, current_level_xp) = self.locate(xp);
        let xp_into_level = xp - current_level_xp;
        let xp_for_next_level = self
            .required_wide(level)
            .map_or(u64::MAX, |wide| u64::try_from(wide).unwrap_or(u64::MAX));

        let mut fraction = xp_into_level as f64 / xp_for_next_level as f64;
        if fraction >= 1.0 {
            // Both operands round to the same f64 near u64::MAX.
            fraction = 1.0 - f64::EPSILON;
        }

        LevelProgress {
            level,
            current_level_xp,
            xp_into_level,
            xp_for_next_level,
            fraction,
        }
    }

    /// Returns the level for `xp` together with that level's cumulative
    /// threshold.
    fn locate(&self, xp: u64) -> (u64, u64) {
        let fits = |level: u64| self.cumulative_fit(level).filter(|&cum| cum <= xp);

        // Invariant: cum(lo) <= xp; hi is either past xp or unrepresentable.
        let mut lo = 1;
        let mut lo_cum = 0;
        let mut hi = 2;
        while let Some(cum) = fits(hi) {
            lo = hi;
            lo_cum = cum;
            match hi.checked_mul(2) {
                Some(next) => hi = next,
                None => {
                    hi = u64::MAX;
                    if let Some(cum) = fits(hi) {
                        return (hi, cum);
                    }
                    break;
                },
            }
        }

        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            if let Some(cum) = fits(mid) {
                lo = mid;
                lo_cum = cum;
            } else {
                hi = mid;
            }
        }
        (lo, lo_cum)
    }

    fn required_wide(&self, level: u64) -> Option<u128> {
        let l = u128::from(level);
        let base = u128::from(self.base());
        match self.shape {
            Shape::Linear { .. } => base.checked_mul(l),
            Shape::Quadratic { .. } => base.checked_mul(l)?.checked_mul(l),
            Shape::Exponential { factor, .. } => {
                let exp = u32::try_from(level - 1).ok()?;
                base.checked_mul(u128::from(factor).checked_pow(exp)?)
            },
        }
    }

    /// Closed-form cumulative threshold, `None` if it exceeds `u64`.
    fn cumulative_fit(&self, level: u64) -> Option<u64> {
        // Sum over k = 1..=n of the incremental cost, n = level - 1.
        let n = u128::from(level - 1);
        let base = u128::from(self.base());
        let units = match self.shape {
            Shape::Linear { .. } => n.checked_mul(n + 1)? / 2,
            Shape::Quadratic { .. } => n.checked_mul(n + 1)?.checked_mul(2 * n + 1)? / 6,
            Shape::Exponential { factor, .. } => {
                let factor = u128::from(factor);
                let exp = u32::try_from(n).ok()?;
                (factor.checked_pow(exp)? - 1) / (factor - 1)
            },
        };
        u64::try_from(base.checked_mul(units)?).ok()
    }
}

const fn check_level(level: u64) -> Result<(), LevelingError> {
    if level == 0 {
        return Err(LevelingError::InvalidLevel { level: 0 });
    }
    Ok(())
}

fn check_base(base: u64) -> Result<(), LevelingError> {
    if base == 0 {
        return Err(LevelingError::InvalidCurve {
            reason: "base XP must be at least 1".to_string(),
        });
    }
    Ok(())
}

/// Converts an XP total read from storage.
///
/// # Errors
///
/// [`LevelingError::NegativeXp`] if the stored value is negative.
pub fn xp_from_stored(xp: i64) -> Result<u64, LevelingError> {
    u64::try_from(xp).map_err(|_| LevelingError::NegativeXp { xp })
}

/// Converts a cached level read from storage.
///
/// # Errors
///
/// [`LevelingError::InvalidLevel`] if the stored value is below 1.
pub fn level_from_stored(level: i64) -> Result<u64, LevelingError> {
    match u64::try_from(level) {
        Ok(level) if level >= 1 => Ok(level),
        _ => Err(LevelingError::InvalidLevel { level }),
    }
}
