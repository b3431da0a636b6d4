//! Milestone boost schedule.
//!
//! A roll is "milestone" when the count it completes is a multiple of a
//! configured threshold. When several thresholds divide the same count the
//! largest one wins; multipliers are never combined.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{DEFAULT_BOOST_LEVELS, NO_BOOST};

/// A single `(threshold, multiplier)` milestone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostLevel {
    /// Applies to every roll whose completed count is a multiple of this value.
    pub threshold: u64,
    pub multiplier: f64,
}

impl BoostLevel {
    #[must_use]
    pub const fn new(threshold: u64, multiplier: f64) -> Self {
        Self {
            threshold,
            multiplier,
        }
    }

    /// Whether the roll completing `completed` matches this milestone.
    #[must_use]
    pub const fn matches(&self, completed: u64) -> bool {
        self.threshold != 0 && completed.is_multiple_of(self.threshold)
    }
}

/// Errors raised when a boost table violates its invariants.
#[derive(Debug, Error, PartialEq)]
pub enum BoostConfigError {
    #[error("boost threshold must be at least 1")]
    ZeroThreshold,
    #[error("boost threshold {threshold} is listed more than once")]
    DuplicateThreshold { threshold: u64 },
    #[error("multiplier for threshold {threshold} must be finite and at least 1 (got {value})")]
    InvalidMultiplier { threshold: u64, value: f64 },
}

/// Validated milestone table, ordered from largest threshold to smallest.
#[derive(Debug, Clone, PartialEq)]
pub struct BoostSchedule {
    levels: Vec<BoostLevel>,
}

impl BoostSchedule {
    /// Build a schedule from levels in any order.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero threshold, a repeated threshold, or a
    /// multiplier that is non-finite or below 1.
    pub fn new(levels: impl IntoIterator<Item = BoostLevel>) -> Result<Self, BoostConfigError> {
        let mut levels: Vec<BoostLevel> = levels.into_iter().collect();
        for level in &levels {
            if level.threshold == 0 {
                return Err(BoostConfigError::ZeroThreshold);
            }
            if !level.multiplier.is_finite() || level.multiplier < NO_BOOST {
                return Err(BoostConfigError::InvalidMultiplier {
                    threshold: level.threshold,
                    value: level.multiplier,
                });
            }
        }
        levels.sort_by(|a, b| b.threshold.cmp(&a.threshold));
        if let Some(pair) = levels.windows(2).find(|w| w[0].threshold == w[1].threshold) {
            return Err(BoostConfigError::DuplicateThreshold {
                threshold: pair[0].threshold,
            });
        }
        Ok(Self { levels })
    }

    /// Schedule that never boosts.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { levels: Vec::new() }
    }

    /// Levels in evaluation order (largest threshold first).
    #[must_use]
    pub fn levels(&self) -> &[BoostLevel] {
        &self.levels
    }

    /// Boost multiplier for the roll that follows `roll_count` completed rolls.
    #[must_use]
    pub fn compute_boost(&self, roll_count: u64) -> f64 {
        self.matching_level(roll_count)
            .map_or(NO_BOOST, |level| level.multiplier)
    }

    /// The milestone that applies to the next roll, if any.
    #[must_use]
    pub fn matching_level(&self, roll_count: u64) -> Option<&BoostLevel> {
        let completed = roll_count.saturating_add(1);
        self.levels.iter().find(|level| level.matches(completed))
    }
}

impl Default for BoostSchedule {
    fn default() -> Self {
        Self {
            levels: DEFAULT_BOOST_LEVELS
                .iter()
                .map(|&(threshold, multiplier)| BoostLevel::new(threshold, multiplier))
                .collect(),
        }
    }
}

/// Boost for the next roll under the default milestone table.
#[must_use]
pub fn compute_boost(roll_count: u64) -> f64 {
    BoostSchedule::default().compute_boost(roll_count)
}
