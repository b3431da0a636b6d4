//! Weighted title selection with log-dampened boosting.
//!
//! Each eligible entry starts from an inverse-rarity weight `1 / chance_ratio`.
//! Under a boost above 1 the weight is amplified by
//! `1 + ln(max_weight / weight + 1) * (boost - 1)`, so rarer entries gain more
//! than common ones. Entries too common for the boost tier are pruned first.
//!
//! Weights are reported on a relative scale where the heaviest boosted weight
//! is 1. Only ratios between weights matter to the walk, and the scale keeps
//! catalogs mixing `1e-308` and `1e308` ratios finite.

use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{CatalogEntry, EntryId};
use crate::constants::{NO_BOOST, SELECTION_POOL_ID};
use crate::numbers::clamp_unit;
use crate::trace::{Exclusion, ExclusionReason, SelectionTrace, WeightedCandidate};

/// Policy deciding which entries a boost tier can reach.
///
/// Only consulted when the boost is above 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoostPruning {
    /// Exclude entries with `chance_ratio < boost`; a ratio equal to the boost stays.
    #[default]
    Inclusive,
    /// Exclude entries with `chance_ratio <= boost`.
    Exclusive,
    /// Never prune; every valid entry stays eligible.
    Disabled,
}

impl BoostPruning {
    #[must_use]
    pub fn is_reachable(self, chance_ratio: f64, boost: f64) -> bool {
        if boost <= NO_BOOST {
            return true;
        }
        match self {
            Self::Inclusive => chance_ratio >= boost,
            Self::Exclusive => chance_ratio > boost,
            Self::Disabled => true,
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum SelectError {
    #[error("no catalog entry is eligible at boost {boost} ({excluded} excluded)")]
    NoEligibleEntries { boost: f64, excluded: usize },
}

/// Treat a non-finite boost or one below 1 as no boost.
#[must_use]
pub fn sanitize_boost(boost: f64) -> f64 {
    if boost.is_finite() && boost >= NO_BOOST {
        boost
    } else {
        warn!("ignoring invalid boost {boost}; rolling unboosted");
        NO_BOOST
    }
}

/// Eligible entries paired with their boosted weights, in catalog order.
#[derive(Debug, Clone)]
pub struct WeightTable<'a> {
    boost: f64,
    rows: Vec<(&'a CatalogEntry, WeightedCandidate)>,
    excluded: Vec<Exclusion>,
    total_weight: f64,
    fallback: &'a CatalogEntry,
}

impl<'a> WeightTable<'a> {
    #[must_use]
    pub const fn boost(&self) -> f64 {
        self.boost
    }

    #[must_use]
    pub const fn total_weight(&self) -> f64 {
        self.total_weight
    }

    pub fn candidates(&self) -> impl Iterator<Item = &WeightedCandidate> {
        self.rows.iter().map(|(_, candidate)| candidate)
    }

    pub fn entries(&self) -> impl Iterator<Item = &'a CatalogEntry> + '_ {
        self.rows.iter().map(|(entry, _)| *entry)
    }

    #[must_use]
    pub fn excluded(&self) -> &[Exclusion] {
        &self.excluded
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Always false; an empty eligible set never produces a table.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Exact selection probability of `id`, or `None` when it is not eligible.
    #[must_use]
    pub fn probability(&self, id: EntryId) -> Option<f64> {
        self.rows
            .iter()
            .find(|(entry, _)| entry.id == id)
            .map(|(_, candidate)| candidate.final_weight / self.total_weight)
    }

    /// Walk the table with a uniform draw in `[0, 1)`.
    ///
    /// Returns the chosen entry and the scaled roll. Out-of-range draws are
    /// clamped. Rows whose weight underflowed to zero are never chosen. When
    /// rounding exhausts the walk the last entry with weight wins.
    #[must_use]
    pub fn pick(&self, unit: f64) -> (&'a CatalogEntry, f64) {
        let roll = clamp_unit(unit) * self.total_weight;
        let mut remaining = roll;
        for (entry, candidate) in self.rows.iter().filter(|(_, c)| c.final_weight > 0.0) {
            remaining -= candidate.final_weight;
            if remaining <= 0.0 {
                return (entry, roll);
            }
        }
        (self.fallback, roll)
    }

    /// Build the audit trace for a finished pick.
    #[must_use]
    pub fn trace(&self, chosen_id: EntryId, roll: f64) -> SelectionTrace {
        SelectionTrace {
            pool_id: String::from(SELECTION_POOL_ID),
            boost: self.boost,
            roll,
            total_weight: self.total_weight,
            candidates: self.candidates().cloned().collect(),
            excluded: self.excluded.clone(),
            chosen_id,
        }
    }
}

/// Filter `entries` and compute boosted weights.
///
/// # Errors
///
/// Returns [`SelectError::NoEligibleEntries`] when validity and reachability
/// filtering leave nothing to choose from.
pub fn weigh(
    entries: &[CatalogEntry],
    boost: f64,
    pruning: BoostPruning,
) -> Result<WeightTable<'_>, SelectError> {
    let boost = sanitize_boost(boost);
    let mut eligible: Vec<(&CatalogEntry, f64)> = Vec::with_capacity(entries.len());
    let mut excluded = Vec::new();

    for entry in entries {
        let exclude = |reason| Exclusion {
            id: entry.id,
            chance_ratio: entry.chance_ratio,
            reason,
        };
        if !entry.has_valid_ratio() {
            excluded.push(exclude(ExclusionReason::InvalidRatio));
            continue;
        }
        if !pruning.is_reachable(entry.chance_ratio, boost) {
            excluded.push(exclude(ExclusionReason::Unreachable));
            continue;
        }
        eligible.push((entry, entry.chance_ratio.ln()));
    }

    // Work in log space relative to the most common entry so extreme ratios
    // never overflow; ln(max_weight / base_weight) is the log-ratio gap.
    let common_ln = eligible
        .iter()
        .map(|(_, ln_ratio)| *ln_ratio)
        .fold(f64::INFINITY, f64::min);
    let logs: Vec<_> = eligible
        .iter()
        .map(|(_, ln_ratio)| {
            let gap = ln_ratio - common_ln;
            let rarity_factor = softplus(gap);
            (gap, rarity_factor, -gap + ln_boost_gain(rarity_factor, boost))
        })
        .collect();
    let heaviest_ln = logs
        .iter()
        .map(|(_, _, ln_final)| *ln_final)
        .fold(f64::NEG_INFINITY, f64::max);

    let rows: Vec<_> = eligible
        .into_iter()
        .zip(logs)
        .map(|((entry, _), (gap, rarity_factor, ln_final))| {
            let candidate = WeightedCandidate {
                id: entry.id,
                base_weight: (-gap - heaviest_ln).exp(),
                rarity_factor,
                final_weight: (ln_final - heaviest_ln).exp(),
            };
            (entry, candidate)
        })
        .collect();
    let total_weight = rows.iter().map(|(_, c)| c.final_weight).sum();
    let Some(fallback) = rows
        .iter()
        .rev()
        .find(|(_, c)| c.final_weight > 0.0)
        .map(|(entry, _)| *entry)
    else {
        return Err(SelectError::NoEligibleEntries {
            boost,
            excluded: excluded.len(),
        });
    };

    Ok(WeightTable {
        boost,
        rows,
        excluded,
        total_weight,
        fallback,
    })
}

/// `ln(1 + e^x)` for `x >= 0` without overflowing.
fn softplus(x: f64) -> f64 {
    x + (-x).exp().ln_1p()
}

/// `ln(1 + rarity_factor * (boost - 1))`; zero when unboosted.
fn ln_boost_gain(rarity_factor: f64, boost: f64) -> f64 {
    if boost <= NO_BOOST {
        return 0.0;
    }
    let amplification = rarity_factor * (boost - NO_BOOST);
    if amplification.is_finite() {
        amplification.ln_1p()
    } else {
        rarity_factor.ln() + (boost - NO_BOOST).ln()
    }
}

/// Select one entry from `entries` under `boost`.
///
/// # Errors
///
/// Returns [`SelectError::NoEligibleEntries`] when no entry qualifies.
pub fn select<'a, R>(
    entries: &'a [CatalogEntry],
    boost: f64,
    pruning: BoostPruning,
    rng: &mut R,
) -> Result<&'a CatalogEntry, SelectError>
where
    R: Rng + ?Sized,
{
    select_with_trace(entries, boost, pruning, rng).map(|(entry, _)| entry)
}

/// Like [`select`], also returning the selection trace.
///
/// # Errors
///
/// Returns [`SelectError::NoEligibleEntries`] when no entry qualifies.
pub fn select_with_trace<'a, R>(
    entries: &'a [CatalogEntry],
    boost: f64,
    pruning: BoostPruning,
    rng: &mut R,
) -> Result<(&'a CatalogEntry, SelectionTrace), SelectError>
where
    R: Rng + ?Sized,
{
    let table = weigh(entries, boost, pruning)?;
    let (chosen, roll) = table.pick(rng.r#gen::<f64>());
    debug!(
        "selected {} ({}) from {} eligible, {} excluded, boost {}, roll {roll:.6}/{:.6}",
        chosen.id,
        chosen.label,
        table.len(),
        table.excluded().len(),
        table.boost(),
        table.total_weight()
    );
    Ok((chosen, table.trace(chosen.id, roll)))
}
