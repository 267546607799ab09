//! Filter, sort and page parameters for activity history reads.
//!
//! The stages always run in the same order: filter by kind, sort by
//! timestamp, then slice the requested page out of the filtered set. The
//! reported total describes the filtered set, never the raw log.

use pagination::{Page, PageRequest};
use serde::{Deserialize, Serialize};

use super::activity::{ActivityKind, ActivityLogEntry};

/// Which activity kinds a history read returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityFilter {
    #[default]
    All,
    FavoritesOnly,
    PricesOnly,
}

impl ActivityFilter {
    /// Interpret a request parameter. Unrecognised values mean [`Self::All`].
    ///
    /// # Examples
    /// ```
    /// use gaswatch::domain::ActivityFilter;
    ///
    /// assert_eq!(ActivityFilter::from_param(Some("price")), ActivityFilter::PricesOnly);
    /// assert_eq!(ActivityFilter::from_param(Some("bogus")), ActivityFilter::All);
    /// ```
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("favorites" | "favorites-only" | "favorite") => Self::FavoritesOnly,
            Some("price" | "prices" | "price-only" | "price-update") => Self::PricesOnly,
            _ => Self::All,
        }
    }

    /// Activity kinds admitted by the filter.
    pub fn kinds(self) -> &'static [ActivityKind] {
        match self {
            Self::All => &ActivityKind::ALL,
            Self::FavoritesOnly => &[ActivityKind::AddFavorite, ActivityKind::RemoveFavorite],
            Self::PricesOnly => &[ActivityKind::PriceUpdate],
        }
    }

    pub fn admits(self, kind: ActivityKind) -> bool {
        self.kinds().contains(&kind)
    }
}

/// Timestamp ordering of a history page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    /// Interpret a request parameter, falling back to [`Self::Descending`].
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("asc" | "ascending" | "oldest") => Self::Ascending,
            _ => Self::Descending,
        }
    }
}

/// A complete history read request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityLogQuery {
    pub filter: ActivityFilter,
    pub order: SortOrder,
    pub page: PageRequest,
}

impl ActivityLogQuery {
    pub const fn new(filter: ActivityFilter, order: SortOrder, page: PageRequest) -> Self {
        Self {
            filter,
            order,
            page,
        }
    }

    /// Run the filter, sort and page stages over a log held in memory.
    ///
    /// `log` must be in insertion order. Entries sharing a timestamp keep
    /// their insertion order when ascending, and the exact reverse of it
    /// when descending.
    pub fn apply(&self, log: &[ActivityLogEntry]) -> Page<ActivityLogEntry> {
        let mut matching: Vec<(usize, &ActivityLogEntry)> = log
            .iter()
            .enumerate()
            .filter(|(_, entry)| self.filter.admits(entry.kind()))
            .collect();
        matching.sort_by_key(|(seq, entry)| (entry.occurred_at, *seq));
        if self.order == SortOrder::Descending {
            matching.reverse();
        }

        let total_count = u64::try_from(matching.len()).unwrap_or(u64::MAX);
        let items = matching
            .get(self.page.bounds(matching.len()))
            .unwrap_or_default()
            .iter()
            .map(|(_, entry)| (*entry).clone())
            .collect();
        Page::new(items, total_count, self.page)
    }
}
