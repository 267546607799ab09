//! Price observation store: records and retracts station price entries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::ports::{PriceCorrelation, PriceLedgerRepository, PriceLedgerRepositoryError};
use crate::domain::{
    CorrelationId, Error, Price, PriceBranch, PriceEntry, Station, StationId, UserId,
};

fn map_repository_error(error: PriceLedgerRepositoryError) -> Error {
    match error {
        PriceLedgerRepositoryError::Connection { message } => {
            Error::store_unavailable(format!("price ledger unavailable: {message}"))
        }
        PriceLedgerRepositoryError::Query { message } => {
            Error::store_failure(format!("price ledger error: {message}"))
        }
    }
}

/// Owns the per-station price histories behind a [`PriceLedgerRepository`].
#[derive(Clone)]
pub struct PriceObservationStore<R> {
    repo: Arc<R>,
}

impl<R> PriceObservationStore<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }
}

impl<R> PriceObservationStore<R>
where
    R: PriceLedgerRepository,
{
    /// Append a new price entry and return its fresh correlation id.
    ///
    /// An unknown station or branch is created, never reported as missing.
    /// `recorded_at` is the ledger's own clock reading; the audit measures
    /// an entry's age from it.
    pub async fn record_price(
        &self,
        station_id: &StationId,
        branch: PriceBranch,
        price: Price,
        reporter_id: UserId,
        reported_at: DateTime<Utc>,
        recorded_at: DateTime<Utc>,
    ) -> Result<CorrelationId, Error> {
        let correlation_id = CorrelationId::random();
        let entry = PriceEntry {
            price,
            reported_by: reporter_id,
            reported_at,
            recorded_at,
            correlation_id,
        };
        self.repo
            .append_price(station_id, branch, &entry)
            .await
            .map_err(map_repository_error)?;
        debug!(
            station_id = %station_id,
            branch = %branch,
            correlation_id = %correlation_id,
            "price entry recorded"
        );
        Ok(correlation_id)
    }

    /// Remove `reported_by`'s entry by correlation id. Idempotent.
    pub async fn retract_price(
        &self,
        station_id: &StationId,
        branch: PriceBranch,
        reported_by: &UserId,
        correlation_id: &CorrelationId,
    ) -> Result<u64, Error> {
        self.repo
            .retract_price(station_id, branch, reported_by, correlation_id)
            .await
            .map_err(map_repository_error)
    }

    /// Read-only snapshot; `None` means no prices yet.
    pub async fn get_station(&self, station_id: &StationId) -> Result<Option<Station>, Error> {
        self.repo
            .find_station(station_id)
            .await
            .map_err(map_repository_error)
    }

    pub async fn list_price_correlations(&self) -> Result<Vec<PriceCorrelation>, Error> {
        self.repo
            .list_price_correlations()
            .await
            .map_err(map_repository_error)
    }
}
