//! Explainability telemetry for weighted title selection.
//!
//! A trace records every candidate the selector considered, the weights it
//! computed, the entries it excluded, and the scaled roll that picked the
//! winner. Callers may store it next to the roll history for audits.

use serde::{Deserialize, Serialize};

use crate::catalog::EntryId;

/// Telemetry for a single selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionTrace {
    /// Identifier for the selection pool (e.g., `titleroll.catalog`).
    pub pool_id: String,
    /// Boost multiplier the weights were computed with.
    pub boost: f64,
    /// Uniform draw scaled to `[0, total_weight)`.
    pub roll: f64,
    pub total_weight: f64,
    /// Eligible candidates in walk order.
    pub candidates: Vec<WeightedCandidate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded: Vec<Exclusion>,
    pub chosen_id: EntryId,
}

/// Weight telemetry captured for one eligible entry.
///
/// Weights share one relative scale on which the heaviest boosted weight is 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedCandidate {
    pub id: EntryId,
    /// Inverse-rarity weight before boosting.
    pub base_weight: f64,
    pub rarity_factor: f64,
    pub final_weight: f64,
}

impl WeightedCandidate {
    /// Effective amplification applied on top of the base weight.
    #[must_use]
    pub fn multiplier(&self) -> f64 {
        if self.base_weight > 0.0 {
            self.final_weight / self.base_weight
        } else {
            1.0
        }
    }
}

/// Why an entry was left out of the eligible set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// The chance ratio was zero, negative, or non-finite.
    InvalidRatio,
    /// The entry is too common to be reachable at the current boost tier.
    Unreachable,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Exclusion {
    pub id: EntryId,
    pub chance_ratio: f64,
    pub reason: ExclusionReason,
}
