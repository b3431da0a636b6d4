//! One roll: milestone boost, weighted pick, fallback policy.

use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::boost::{BoostConfigError, BoostSchedule};
use crate::catalog::CatalogEntry;
use crate::config::{NoEligibleFallback, RollConfig};
use crate::constants::NO_BOOST;
use crate::selector::{BoostPruning, SelectError, select_with_trace};
use crate::trace::SelectionTrace;

/// Inputs the caller has already read from storage.
#[derive(Debug, Clone, Copy)]
pub struct RollRequest<'a> {
    /// Filtered catalog snapshot, in the order the walk should use.
    pub entries: &'a [CatalogEntry],
    /// Rolls the user completed before this one.
    pub prior_rolls: u64,
}

/// Result of a roll, handed back to the caller for persistence and display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollOutcome {
    pub entry: CatalogEntry,
    /// Boost the weights were actually computed with.
    pub boost: f64,
    /// Boost the milestone table asked for.
    pub requested_boost: f64,
    /// Completed rolls including this one.
    pub roll_count: u64,
    pub trace: SelectionTrace,
}

impl RollOutcome {
    /// True when a boosted roll had to fall back to unboosted odds.
    #[must_use]
    pub fn boost_downgraded(&self) -> bool {
        self.boost < self.requested_boost
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RollError {
    #[error(transparent)]
    NoEligibleEntries(#[from] SelectError),
    #[error("invalid boost table: {0}")]
    Config(#[from] BoostConfigError),
}

/// Validated roll settings, ready to serve many rolls.
#[derive(Debug, Clone, PartialEq)]
pub struct Roller {
    schedule: BoostSchedule,
    pruning: BoostPruning,
    on_no_eligible: NoEligibleFallback,
}

impl Roller {
    #[must_use]
    pub const fn new(
        schedule: BoostSchedule,
        pruning: BoostPruning,
        on_no_eligible: NoEligibleFallback,
    ) -> Self {
        Self {
            schedule,
            pruning,
            on_no_eligible,
        }
    }

    /// Build a roller from a config.
    ///
    /// # Errors
    ///
    /// Returns an error when the configured boost table is invalid.
    pub fn from_config(config: &RollConfig) -> Result<Self, BoostConfigError> {
        Ok(Self::new(
            config.schedule()?,
            config.pruning,
            config.on_no_eligible,
        ))
    }

    #[must_use]
    pub const fn schedule(&self) -> &BoostSchedule {
        &self.schedule
    }

    #[must_use]
    pub const fn pruning(&self) -> BoostPruning {
        self.pruning
    }

    /// Roll once for the user described by `request`.
    ///
    /// # Errors
    ///
    /// Returns [`RollError::NoEligibleEntries`] when nothing can be selected,
    /// either because the snapshot has no valid entry or because a boosted
    /// roll pruned everything and the fallback policy is `Fail`.
    pub fn roll<R>(&self, request: RollRequest<'_>, rng: &mut R) -> Result<RollOutcome, RollError>
    where
        R: Rng + ?Sized,
    {
        let requested_boost = self.schedule.compute_boost(request.prior_rolls);
        let roll_count = request.prior_rolls.saturating_add(1);

        let (entry, trace) =
            match select_with_trace(request.entries, requested_boost, self.pruning, rng) {
                Ok(picked) => picked,
                Err(err)
                    if requested_boost > NO_BOOST
                        && self.on_no_eligible == NoEligibleFallback::RetryUnboosted =>
                {
                    warn!("roll {roll_count}: {err}; retrying unboosted");
                    select_with_trace(request.entries, NO_BOOST, self.pruning, rng)?
                }
                Err(err) => return Err(err.into()),
            };

        debug!(
            "roll {roll_count}: awarded {} at boost {} (requested {requested_boost})",
            entry.id, trace.boost
        );
        Ok(RollOutcome {
            entry: entry.clone(),
            boost: trace.boost,
            requested_boost,
            roll_count,
            trace,
        })
    }
}

impl Default for Roller {
    fn default() -> Self {
        Self::new(
            BoostSchedule::default(),
            BoostPruning::default(),
            NoEligibleFallback::default(),
        )
    }
}

/// Roll once using `config`.
///
/// # Errors
///
/// Returns an error when the config is invalid or nothing can be selected.
pub fn roll<R>(
    request: RollRequest<'_>,
    config: &RollConfig,
    rng: &mut R,
) -> Result<RollOutcome, RollError>
where
    R: Rng + ?Sized,
{
    Roller::from_config(config)?.roll(request, rng)
}
