//! In-process stand-ins for the catalog store and roll ledger.

use anyhow::{Context, Result};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::convert::Infallible;
use std::path::Path;
use titleroll_core::{
    Catalog, CatalogEntry, CatalogFilter, CatalogSource, EntryId, RollLedger, RollRecord, UserId,
};

const DEFAULT_CATALOG: &str = include_str!("../assets/default_catalog.json");

/// Catalog held in memory, loaded once from JSON.
#[derive(Debug, Clone)]
pub struct JsonCatalog {
    catalog: Catalog,
}

impl JsonCatalog {
    pub fn load_default() -> Result<Self> {
        Self::from_json(DEFAULT_CATALOG).context("parsing bundled catalog")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("failed to parse {}", path.display()))
    }

    fn from_json(json: &str) -> Result<Self> {
        Ok(Self {
            catalog: Catalog::from_json(json)?,
        })
    }

    pub fn label(&self, id: EntryId) -> &str {
        self.catalog.get(id).map_or("<unknown>", |entry| entry.label.as_str())
    }
}

impl CatalogSource for JsonCatalog {
    type Error = Infallible;

    fn load_catalog(&self, filter: &CatalogFilter) -> Result<Vec<CatalogEntry>, Self::Error> {
        Ok(self.catalog.snapshot(filter))
    }
}

/// Ledger keeping counters, current titles and history in memory.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    counts: RefCell<HashMap<UserId, u64>>,
    titles: RefCell<HashMap<UserId, EntryId>>,
    history: RefCell<Vec<RollRecord>>,
}

impl MemoryLedger {
    pub fn current_title(&self, user: UserId) -> Option<EntryId> {
        self.titles.borrow().get(&user).copied()
    }

    /// Awards per entry across every recorded roll, ordered by entry id.
    pub fn awards(&self) -> BTreeMap<EntryId, u64> {
        let mut awards = BTreeMap::new();
        for record in self.history.borrow().iter() {
            *awards.entry(record.entry_id).or_insert(0) += 1;
        }
        awards
    }
}

impl RollLedger for MemoryLedger {
    type Error = Infallible;

    fn roll_count(&self, user: UserId) -> Result<u64, Self::Error> {
        Ok(self.counts.borrow().get(&user).copied().unwrap_or(0))
    }

    fn record_roll(&self, record: &RollRecord) -> Result<(), Self::Error> {
        self.counts.borrow_mut().insert(record.user, record.roll_count);
        self.titles.borrow_mut().insert(record.user, record.entry_id);
        self.history.borrow_mut().push(record.clone());
        Ok(())
    }
}
