use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A title that can be awarded by a roll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: EntryId,
    pub label: String,
    /// Rarity expressed as "1 in N"; larger values are rarer.
    pub chance_ratio: f64,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
}

const fn default_active() -> bool {
    true
}

impl CatalogEntry {
    #[must_use]
    pub fn new(id: u64, label: impl Into<String>, chance_ratio: f64) -> Self {
        Self {
            id: EntryId(id),
            label: label.into(),
            chance_ratio,
            active: true,
            season: None,
        }
    }

    #[must_use]
    pub fn in_season(mut self, season: impl Into<String>) -> Self {
        self.season = Some(season.into());
        self
    }

    #[must_use]
    pub const fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// True when the ratio can be turned into a selection weight.
    #[must_use]
    pub fn has_valid_ratio(&self) -> bool {
        crate::numbers::positive_finite(self.chance_ratio).is_some()
    }
}

/// Caller-side filter producing the snapshot handed to the selector.
///
/// The active season is always passed explicitly; there is no implicit
/// "current season".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CatalogFilter {
    /// Restrict to entries of this season. Entries without a season match any.
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

impl CatalogFilter {
    #[must_use]
    pub fn for_season(season: impl Into<String>) -> Self {
        Self {
            season: Some(season.into()),
            include_inactive: false,
        }
    }

    #[must_use]
    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        if !self.include_inactive && !entry.active {
            return false;
        }
        match (&self.season, &entry.season) {
            (Some(wanted), Some(season)) => wanted.eq_ignore_ascii_case(season),
            _ => true,
        }
    }
}

/// Container for every known catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Catalog {
    pub entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Load a catalog from a JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a valid catalog.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Filtered copy of the catalog, preserving catalog order.
    #[must_use]
    pub fn snapshot(&self, filter: &CatalogFilter) -> Vec<CatalogEntry> {
        self.entries
            .iter()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn get(&self, id: EntryId) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }
}
