//! Driven port for the per-station price ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CorrelationId, PriceBranch, PriceEntry, Station, StationId, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by price ledger adapters.
    pub enum PriceLedgerRepositoryError {
        /// The backing store could not be reached.
        Connection { message: String } =>
            "price ledger repository connection failed: {message}",
        /// A read or write failed during execution.
        Query { message: String } =>
            "price ledger repository query failed: {message}",
    }
}

/// Where a price-update correlation id lives on either side of the ledger.
///
/// The station, branch and user together with the correlation id form the
/// key both retractions match on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceCorrelation {
    pub correlation_id: CorrelationId,
    pub station_id: StationId,
    pub branch: PriceBranch,
    pub user_id: UserId,
    /// When the price side stored the entry, or the log entry's timestamp
    /// for records listed from the activity log.
    pub recorded_at: DateTime<Utc>,
}

/// Port for appending to and retracting from station price histories.
///
/// Implementations must make each call atomic for its station: two
/// concurrent appends to the same branch both land.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceLedgerRepository: Send + Sync {
    /// Append `entry` to `branch`, creating the station and branch on first
    /// use.
    async fn append_price(
        &self,
        station_id: &StationId,
        branch: PriceBranch,
        entry: &PriceEntry,
    ) -> Result<(), PriceLedgerRepositoryError>;

    /// Remove the entry with `correlation_id` from `branch`, provided it was
    /// reported by `reported_by`.
    ///
    /// Returns the number of entries removed. A missing station, branch or
    /// entry, or one reported by someone else, removes nothing and is not an
    /// error.
    async fn retract_price(
        &self,
        station_id: &StationId,
        branch: PriceBranch,
        reported_by: &UserId,
        correlation_id: &CorrelationId,
    ) -> Result<u64, PriceLedgerRepositoryError>;

    /// Snapshot a station, or `None` when it has never been reported.
    async fn find_station(
        &self,
        station_id: &StationId,
    ) -> Result<Option<Station>, PriceLedgerRepositoryError>;

    /// Every price entry's correlation id with its location.
    async fn list_price_correlations(
        &self,
    ) -> Result<Vec<PriceCorrelation>, PriceLedgerRepositoryError>;
}

/// Fixture implementation for tests that never touch the price ledger.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixturePriceLedgerRepository;

#[async_trait]
impl PriceLedgerRepository for FixturePriceLedgerRepository {
    async fn append_price(
        &self,
        _station_id: &StationId,
        _branch: PriceBranch,
        _entry: &PriceEntry,
    ) -> Result<(), PriceLedgerRepositoryError> {
        Ok(())
    }

    async fn retract_price(
        &self,
        _station_id: &StationId,
        _branch: PriceBranch,
        _reported_by: &UserId,
        _correlation_id: &CorrelationId,
    ) -> Result<u64, PriceLedgerRepositoryError> {
        Ok(0)
    }

    async fn find_station(
        &self,
        _station_id: &StationId,
    ) -> Result<Option<Station>, PriceLedgerRepositoryError> {
        Ok(None)
    }

    async fn list_price_correlations(
        &self,
    ) -> Result<Vec<PriceCorrelation>, PriceLedgerRepositoryError> {
        Ok(Vec::new())
    }
}
