//! Entries of a user's append-only activity log, and favorite bookmarks.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::correlation::CorrelationId;
use super::station::{Price, PriceBranch, StationDetails, StationId};

/// Error returned when a stored activity kind label is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown activity kind `{0}`")]
pub struct UnknownActivityKind(pub String);

/// Category of a logged activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityKind {
    PriceUpdate,
    AddFavorite,
    RemoveFavorite,
}

impl ActivityKind {
    pub const ALL: [Self; 3] = [Self::PriceUpdate, Self::AddFavorite, Self::RemoveFavorite];

    /// Stable label used in storage and log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PriceUpdate => "price-update",
            Self::AddFavorite => "add-favorite",
            Self::RemoveFavorite => "remove-favorite",
        }
    }

    pub fn is_favorite(self) -> bool {
        matches!(self, Self::AddFavorite | Self::RemoveFavorite)
    }
}

impl FromStr for ActivityKind {
    type Err = UnknownActivityKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| UnknownActivityKind(value.to_owned()))
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened, with the data specific to each kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Activity {
    /// The user reported a price. Paired with exactly one price entry.
    #[serde(rename_all = "camelCase")]
    PriceUpdate {
        correlation_id: CorrelationId,
        branch: PriceBranch,
        price: Price,
    },
    AddFavorite,
    RemoveFavorite,
}

impl Activity {
    pub fn kind(&self) -> ActivityKind {
        match self {
            Self::PriceUpdate { .. } => ActivityKind::PriceUpdate,
            Self::AddFavorite => ActivityKind::AddFavorite,
            Self::RemoveFavorite => ActivityKind::RemoveFavorite,
        }
    }
}

/// One row of a user's activity log.
///
/// Entries are never edited. Price-update entries leave the log only when
/// their price entry is retracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogEntry {
    #[serde(flatten)]
    pub activity: Activity,
    pub station: StationDetails,
    pub occurred_at: DateTime<Utc>,
}

impl ActivityLogEntry {
    pub fn price_update(
        station: StationDetails,
        branch: PriceBranch,
        price: Price,
        correlation_id: CorrelationId,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            activity: Activity::PriceUpdate {
                correlation_id,
                branch,
                price,
            },
            station,
            occurred_at,
        }
    }

    pub fn add_favorite(station: StationDetails, occurred_at: DateTime<Utc>) -> Self {
        Self {
            activity: Activity::AddFavorite,
            station,
            occurred_at,
        }
    }

    pub fn remove_favorite(station: StationDetails, occurred_at: DateTime<Utc>) -> Self {
        Self {
            activity: Activity::RemoveFavorite,
            station,
            occurred_at,
        }
    }

    pub fn kind(&self) -> ActivityKind {
        self.activity.kind()
    }

    /// Correlation id of a price update; `None` for favorite events.
    pub fn correlation_id(&self) -> Option<CorrelationId> {
        match &self.activity {
            Activity::PriceUpdate { correlation_id, .. } => Some(*correlation_id),
            Activity::AddFavorite | Activity::RemoveFavorite => None,
        }
    }

    /// Whether this entry logs the price report `correlation_id` made at
    /// `station_id` under `branch`.
    pub fn records_price(
        &self,
        station_id: &StationId,
        branch: PriceBranch,
        correlation_id: CorrelationId,
    ) -> bool {
        match &self.activity {
            Activity::PriceUpdate {
                correlation_id: logged,
                branch: logged_branch,
                ..
            } => {
                *logged == correlation_id
                    && *logged_branch == branch
                    && self.station.id == *station_id
            }
            Activity::AddFavorite | Activity::RemoveFavorite => false,
        }
    }
}

/// A bookmarked station. Unique by station id within a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub station: StationDetails,
    pub added_at: DateTime<Utc>,
}
