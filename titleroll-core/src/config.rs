//! Roll configuration loaded from JSON.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::boost::{BoostConfigError, BoostLevel, BoostSchedule};
use crate::selector::BoostPruning;

/// What to do when a boosted roll prunes every entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoEligibleFallback {
    /// Retry once without boost and report the downgrade on the outcome.
    #[default]
    RetryUnboosted,
    /// Surface the failure to the caller.
    Fail,
}

#[derive(Debug, Error)]
pub enum RollConfigError {
    #[error("roll config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Boost(#[from] BoostConfigError),
}

/// Tunables for a roll: milestone table, pruning policy, and fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollConfig {
    #[serde(default = "RollConfig::default_boost_levels")]
    pub boost_levels: Vec<BoostLevel>,
    #[serde(default)]
    pub pruning: BoostPruning,
    #[serde(default)]
    pub on_no_eligible: NoEligibleFallback,
}

impl RollConfig {
    fn default_boost_levels() -> Vec<BoostLevel> {
        BoostSchedule::default().levels().to_vec()
    }

    /// Parse and validate a JSON config.
    ///
    /// # Errors
    ///
    /// Returns an error when the JSON is malformed or the boost table is invalid.
    pub fn from_json(json: &str) -> Result<Self, RollConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the milestone table.
    ///
    /// # Errors
    ///
    /// Returns the first boost-table violation found.
    pub fn validate(&self) -> Result<(), BoostConfigError> {
        self.schedule().map(|_| ())
    }

    /// Validated boost schedule built from `boost_levels`.
    ///
    /// # Errors
    ///
    /// Returns an error when a level is invalid or repeated.
    pub fn schedule(&self) -> Result<BoostSchedule, BoostConfigError> {
        BoostSchedule::new(self.boost_levels.iter().copied())
    }
}

impl Default for RollConfig {
    fn default() -> Self {
        Self {
            boost_levels: Self::default_boost_levels(),
            pruning: BoostPruning::default(),
            on_no_eligible: NoEligibleFallback::default(),
        }
    }
}
