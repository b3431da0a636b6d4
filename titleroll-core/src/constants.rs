//! Centralized tuning constants for titleroll roll logic.
//!
//! The default milestone table lives here so that odds can only be adjusted
//! through reviewed code or an explicit `RollConfig`, never by ambient state.

// Boost schedule -----------------------------------------------------------
/// Multiplier used when no milestone matches.
pub const NO_BOOST: f64 = 1.0;

/// Default `(threshold, multiplier)` milestones, largest threshold first.
pub(crate) const DEFAULT_BOOST_LEVELS: [(u64, f64); 5] = [
    (10_000, 10_000.0),
    (1_000, 1_000.0),
    (300, 100.0),
    (100, 50.0),
    (10, 10.0),
];

// Trace identifiers --------------------------------------------------------
pub(crate) const SELECTION_POOL_ID: &str = "titleroll.catalog";

// Seed domains -------------------------------------------------------------
pub(crate) const ROLL_STREAM_DOMAIN: &[u8] = b"titleroll-user-";

#[cfg(test)]
pub(crate) const FLOAT_EPSILON: f64 = 1e-9;
