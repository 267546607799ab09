//! Ledger coordinator: the single entry point for ledger writes.
//!
//! Price submissions and retractions are dual-writes. The station ledger is
//! written first and the reporter's activity log second, both under the same
//! correlation id. There is no transaction spanning the two; when the second
//! write fails after the first committed, the caller receives a
//! `PartialConsistency` error describing both sides, and the ledger audit can
//! reconcile the orphan later.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{debug, error, warn};

use crate::domain::ports::{
    ActivityLogRepository, AddFavoriteResponse, FavoriteChange, FavoriteRequest, LedgerCommand,
    PriceLedgerRepository, PriceRetraction, PriceSubmission, RemoveFavoriteResponse,
    RetractPriceRequest, RetractPriceResponse, SubmitPriceRequest, SubmitPriceResponse,
};
use crate::domain::{
    ActivityLogEntry, ActivityLogStore, CorrelationId, Error, Favorite, LedgerSide, PartialWrite,
    PriceObservationStore,
};

const SUBMIT_PRICE: &str = "submitPrice";
const RETRACT_PRICE: &str = "retractPrice";

fn log_side_failed(operation: &'static str, correlation_id: CorrelationId, cause: &Error) -> Error {
    Error::partial_consistency(PartialWrite {
        operation,
        correlation_id: correlation_id.to_string(),
        committed: LedgerSide::PriceLedger,
        failed: LedgerSide::ActivityLog,
        cause: cause.to_string(),
    })
}

/// Orchestrates the price observation and activity log stores.
#[derive(Clone)]
pub struct LedgerCoordinator<P, A> {
    prices: PriceObservationStore<P>,
    activity: ActivityLogStore<A>,
    clock: Arc<dyn Clock>,
}

impl<P, A> LedgerCoordinator<P, A> {
    /// Build a coordinator over explicit store handles.
    ///
    /// `clock` stamps favorite events and the time a price entry is stored;
    /// price reports carry their own observation time.
    pub fn new(price_repo: Arc<P>, activity_repo: Arc<A>, clock: Arc<dyn Clock>) -> Self {
        Self {
            prices: PriceObservationStore::new(price_repo),
            activity: ActivityLogStore::new(activity_repo),
            clock,
        }
    }
}

#[async_trait]
impl<P, A> LedgerCommand for LedgerCoordinator<P, A>
where
    P: PriceLedgerRepository,
    A: ActivityLogRepository,
{
    async fn submit_price(
        &self,
        request: SubmitPriceRequest,
    ) -> Result<SubmitPriceResponse, Error> {
        let PriceSubmission {
            station,
            branch,
            price,
            reporter_id,
            reported_at,
        } = PriceSubmission::try_from(request)?;

        self.activity.require_account(&reporter_id).await?;

        let correlation_id = self
            .prices
            .record_price(
                &station.id,
                branch,
                price.clone(),
                reporter_id.clone(),
                reported_at,
                self.clock.utc(),
            )
            .await?;

        let entry =
            ActivityLogEntry::price_update(station, branch, price, correlation_id, reported_at);
        if let Err(cause) = self.activity.append_log(&reporter_id, &entry).await {
            error!(
                operation = SUBMIT_PRICE,
                correlation_id = %correlation_id,
                station_id = %entry.station.id,
                user_id = %reporter_id,
                error = %cause,
                "price recorded but activity log append failed"
            );
            return Err(log_side_failed(SUBMIT_PRICE, correlation_id, &cause));
        }

        debug!(
            operation = SUBMIT_PRICE,
            correlation_id = %correlation_id,
            station_id = %entry.station.id,
            user_id = %reporter_id,
            "price submitted"
        );
        Ok(SubmitPriceResponse { correlation_id })
    }

    async fn retract_price(
        &self,
        request: RetractPriceRequest,
    ) -> Result<RetractPriceResponse, Error> {
        let PriceRetraction {
            station_id,
            branch,
            correlation_id,
            reporter_id,
        } = PriceRetraction::try_from(request)?;

        let prices_removed = self
            .prices
            .retract_price(&station_id, branch, &reporter_id, &correlation_id)
            .await?;

        let log_entries_removed = match self
            .activity
            .retract_log_by_correlation(&reporter_id, &station_id, branch, &correlation_id)
            .await
        {
            Ok(removed) => removed,
            Err(cause) if prices_removed > 0 => {
                warn!(
                    operation = RETRACT_PRICE,
                    correlation_id = %correlation_id,
                    station_id = %station_id,
                    user_id = %reporter_id,
                    error = %cause,
                    "price retracted but activity log retraction failed"
                );
                return Err(log_side_failed(RETRACT_PRICE, correlation_id, &cause));
            }
            Err(cause) => return Err(cause),
        };

        debug!(
            operation = RETRACT_PRICE,
            correlation_id = %correlation_id,
            station_id = %station_id,
            user_id = %reporter_id,
            prices_removed,
            log_entries_removed,
            "price retracted"
        );
        Ok(RetractPriceResponse {
            prices_removed,
            log_entries_removed,
        })
    }

    async fn add_favorite(&self, request: FavoriteRequest) -> Result<AddFavoriteResponse, Error> {
        let FavoriteChange { user_id, station } = FavoriteChange::try_from(request)?;
        let now = self.clock.utc();
        let favorite = Favorite {
            station: station.clone(),
            added_at: now,
        };
        let entry = ActivityLogEntry::add_favorite(station, now);

        let added = self
            .activity
            .add_favorite(&user_id, &favorite, &entry)
            .await?;
        debug!(
            operation = "addFavorite",
            station_id = %favorite.station.id,
            user_id = %user_id,
            added,
            "favorite added"
        );
        Ok(AddFavoriteResponse { added })
    }

    async fn remove_favorite(
        &self,
        request: FavoriteRequest,
    ) -> Result<RemoveFavoriteResponse, Error> {
        let FavoriteChange { user_id, station } = FavoriteChange::try_from(request)?;
        let station_id = station.id.clone();
        let entry = ActivityLogEntry::remove_favorite(station, self.clock.utc());

        let removed = self
            .activity
            .remove_favorite(&user_id, &station_id, &entry)
            .await?;
        debug!(
            operation = "removeFavorite",
            station_id = %station_id,
            user_id = %user_id,
            removed,
            "favorite removed"
        );
        Ok(RemoveFavoriteResponse { removed })
    }
}

#[cfg(test)]
#[path = "ledger_coordinator_tests.rs"]
mod tests;
