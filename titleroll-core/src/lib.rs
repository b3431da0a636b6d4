//! Titleroll Core
//!
//! Weighted title selection with milestone odds boosting. This crate holds the
//! pure roll logic; storage of catalogs, users, and history is supplied by the
//! caller through [`CatalogSource`] and [`RollLedger`].

pub mod boost;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod numbers;
pub mod rng;
pub mod roll;
pub mod selector;
pub mod trace;

use anyhow::Context;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export commonly used types
pub use boost::{BoostConfigError, BoostLevel, BoostSchedule, compute_boost};
pub use catalog::{Catalog, CatalogEntry, CatalogFilter, EntryId};
pub use config::{NoEligibleFallback, RollConfig, RollConfigError};
pub use rng::{CountingRng, RollRng};
pub use roll::{RollError, RollOutcome, RollRequest, Roller, roll};
pub use selector::{BoostPruning, SelectError, WeightTable, select, select_with_trace, weigh};
pub use trace::{Exclusion, ExclusionReason, SelectionTrace, WeightedCandidate};

/// Identifier of the user a roll is made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the ledger persists after a successful roll.
///
/// `entry_id` becomes the user's current title, the record itself is one
/// history row, and `roll_count` is the user's new counter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollRecord {
    pub user: UserId,
    pub entry_id: EntryId,
    pub boost: f64,
    pub roll_count: u64,
}

impl RollRecord {
    #[must_use]
    pub const fn from_outcome(user: UserId, outcome: &RollOutcome) -> Self {
        Self {
            user,
            entry_id: outcome.entry.id,
            boost: outcome.boost,
            roll_count: outcome.roll_count,
        }
    }
}

/// Read side of the title catalog store
/// The returned snapshot must already honour the filter's season and active flag
pub trait CatalogSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the catalog entries matching `filter`, in walk order
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded.
    fn load_catalog(&self, filter: &CatalogFilter) -> Result<Vec<CatalogEntry>, Self::Error>;
}

/// Per-user roll counter, current title, and roll history
/// Implementations should apply `record_roll` atomically
pub trait RollLedger {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Completed rolls for `user` (zero for a user never seen before)
    ///
    /// # Errors
    ///
    /// Returns an error if the counter cannot be read.
    fn roll_count(&self, user: UserId) -> Result<u64, Self::Error>;

    /// Persist the title, history row, and counter for a finished roll
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be stored.
    fn record_roll(&self, record: &RollRecord) -> Result<(), Self::Error>;
}

/// Roll service wiring the pure core to its storage collaborators
pub struct RollEngine<C, L>
where
    C: CatalogSource,
    L: RollLedger,
{
    catalog: C,
    ledger: L,
    roller: Roller,
}

impl<C, L> RollEngine<C, L>
where
    C: CatalogSource,
    L: RollLedger,
{
    /// Create a new engine with the provided collaborators and roll settings
    pub const fn new(catalog: C, ledger: L, roller: Roller) -> Self {
        Self {
            catalog,
            ledger,
            roller,
        }
    }

    /// Create a new engine from a roll config
    ///
    /// # Errors
    ///
    /// Returns an error if the configured boost table is invalid.
    pub fn with_config(catalog: C, ledger: L, config: &RollConfig) -> Result<Self, BoostConfigError> {
        Ok(Self::new(catalog, ledger, Roller::from_config(config)?))
    }

    pub const fn roller(&self) -> &Roller {
        &self.roller
    }

    pub const fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Roll for `user` against the catalog selected by `filter` and record it
    ///
    /// # Errors
    ///
    /// Returns an error if a collaborator fails, the catalog snapshot is
    /// empty, or no entry is eligible. Nothing is recorded on error.
    pub fn roll<R>(
        &self,
        user: UserId,
        filter: &CatalogFilter,
        rng: &mut R,
    ) -> Result<RollOutcome, anyhow::Error>
    where
        R: Rng + ?Sized,
    {
        let prior_rolls = self
            .ledger
            .roll_count(user)
            .with_context(|| format!("reading roll count for user {user}"))?;
        let entries = self
            .catalog
            .load_catalog(filter)
            .context("loading catalog snapshot")?;
        anyhow::ensure!(
            !entries.is_empty(),
            "catalog snapshot is empty (season {:?})",
            filter.season
        );

        let outcome = self
            .roller
            .roll(
                RollRequest {
                    entries: &entries,
                    prior_rolls,
                },
                rng,
            )
            .with_context(|| format!("rolling for user {user}"))?;

        self.ledger
            .record_roll(&RollRecord::from_outcome(user, &outcome))
            .with_context(|| format!("recording roll {} for user {user}", outcome.roll_count))?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct FixtureCatalog {
        catalog: Catalog,
    }

    impl CatalogSource for FixtureCatalog {
        type Error = Infallible;

        fn load_catalog(&self, filter: &CatalogFilter) -> Result<Vec<CatalogEntry>, Self::Error> {
            Ok(self.catalog.snapshot(filter))
        }
    }

    #[derive(Clone, Default)]
    struct MemoryLedger {
        counts: Rc<RefCell<HashMap<UserId, u64>>>,
        history: Rc<RefCell<Vec<RollRecord>>>,
    }

    impl RollLedger for MemoryLedger {
        type Error = Infallible;

        fn roll_count(&self, user: UserId) -> Result<u64, Self::Error> {
            Ok(self.counts.borrow().get(&user).copied().unwrap_or(0))
        }

        fn record_roll(&self, record: &RollRecord) -> Result<(), Self::Error> {
            self.counts.borrow_mut().insert(record.user, record.roll_count);
            self.history.borrow_mut().push(record.clone());
            Ok(())
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("ledger offline")]
    struct Offline;

    struct OfflineLedger;

    impl RollLedger for OfflineLedger {
        type Error = Offline;

        fn roll_count(&self, _user: UserId) -> Result<u64, Self::Error> {
            Err(Offline)
        }

        fn record_roll(&self, _record: &RollRecord) -> Result<(), Self::Error> {
            Err(Offline)
        }
    }

    fn fixture_catalog() -> FixtureCatalog {
        FixtureCatalog {
            catalog: Catalog::from_entries(vec![
                CatalogEntry::new(1, "Rookie", 2.0),
                CatalogEntry::new(2, "Veteran", 20.0),
                CatalogEntry::new(3, "Mythic", 500.0).in_season("s1"),
            ]),
        }
    }

    #[test]
    fn engine_rolls_and_records_history() {
        let ledger = MemoryLedger::default();
        let engine = RollEngine::new(fixture_catalog(), ledger.clone(), Roller::default());
        let mut rng = ChaCha20Rng::seed_from_u64(0xABCD);
        let user = UserId(42);

        for expected in 1..=12 {
            let outcome = engine
                .roll(user, &CatalogFilter::for_season("s1"), &mut rng)
                .unwrap();
            assert_eq!(outcome.roll_count, expected);
        }

        let history = ledger.history.borrow();
        assert_eq!(history.len(), 12);
        assert_eq!(ledger.roll_count(user).unwrap(), 12);
        // The tenth roll is a milestone and prunes the ratio-2 title.
        assert!((history[9].boost - 10.0).abs() < f64::EPSILON);
        assert_ne!(history[9].entry_id, EntryId(1));
        assert!((history[10].boost - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_snapshot_is_reported_without_recording() {
        let ledger = MemoryLedger::default();
        let engine = RollEngine::new(FixtureCatalog::default(), ledger.clone(), Roller::default());
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let err = engine
            .roll(UserId(1), &CatalogFilter::default(), &mut rng)
            .unwrap_err();
        assert!(err.to_string().contains("catalog snapshot is empty"));
        assert!(ledger.history.borrow().is_empty());
    }

    #[test]
    fn no_eligible_entries_surfaces_roll_error() {
        let catalog = FixtureCatalog {
            catalog: Catalog::from_entries(vec![CatalogEntry::new(1, "Broken", -1.0)]),
        };
        let engine = RollEngine::new(catalog, MemoryLedger::default(), Roller::default());
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let err = engine
            .roll(UserId(1), &CatalogFilter::default(), &mut rng)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RollError>(),
            Some(RollError::NoEligibleEntries(_))
        ));
    }

    #[test]
    fn ledger_errors_carry_context() {
        let engine = RollEngine::new(fixture_catalog(), OfflineLedger, Roller::default());
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let err = engine
            .roll(UserId(7), &CatalogFilter::default(), &mut rng)
            .unwrap_err();
        assert_eq!(err.to_string(), "reading roll count for user 7");
        assert!(err.downcast_ref::<Offline>().is_some());
    }

    #[test]
    fn with_config_rejects_invalid_tables() {
        let config = RollConfig {
            boost_levels: vec![BoostLevel::new(10, 0.0)],
            ..RollConfig::default()
        };
        let result = RollEngine::with_config(fixture_catalog(), MemoryLedger::default(), &config);
        assert!(result.is_err());
    }
}
