//! PostgreSQL-backed `PriceLedgerRepository`.
//!
//! A station and its branch markers are created lazily by the first append,
//! inside the same transaction as the entry itself. Retraction deletes the
//! entry row and leaves the branch marker, so an emptied branch still reads
//! back as an empty list.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};

use crate::domain::ports::{PriceCorrelation, PriceLedgerRepository, PriceLedgerRepositoryError};
use crate::domain::{CorrelationId, PriceBranch, PriceEntry, Station, StationId, UserId};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::{NewPriceEntryRow, NewStationRow, PriceEntryRow, StationBranchRow};
use super::pool::{DbPool, PoolError};
use super::schema::{price_entries, station_branches, stations};

/// Diesel implementation of the price ledger port.
#[derive(Clone)]
pub struct DieselPriceLedgerRepository {
    pool: DbPool,
}

impl DieselPriceLedgerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn pool_error(error: PoolError) -> PriceLedgerRepositoryError {
    map_pool_error(error, PriceLedgerRepositoryError::connection)
}

fn diesel_error(error: diesel::result::Error) -> PriceLedgerRepositoryError {
    map_diesel_error(
        error,
        PriceLedgerRepositoryError::query,
        PriceLedgerRepositoryError::connection,
    )
}

/// Rebuild a station from its branch markers and its entries in `seq` order.
fn assemble_station(
    station_id: StationId,
    branches: Vec<StationBranchRow>,
    entries: Vec<PriceEntryRow>,
) -> Result<Station, PriceLedgerRepositoryError> {
    let mut station = Station::new(station_id);
    for row in branches {
        station.ensure_branch(row.branch().map_err(PriceLedgerRepositoryError::query)?);
    }
    for row in entries {
        let (branch, entry) = row
            .into_branch_entry()
            .map_err(PriceLedgerRepositoryError::query)?;
        station.append(branch, entry);
    }
    Ok(station)
}

#[async_trait]
impl PriceLedgerRepository for DieselPriceLedgerRepository {
    async fn append_price(
        &self,
        station_id: &StationId,
        branch: PriceBranch,
        entry: &PriceEntry,
    ) -> Result<(), PriceLedgerRepositoryError> {
        let station_row = NewStationRow {
            id: station_id.as_ref(),
        };
        let branch_row = StationBranchRow::new(station_id, branch);
        let entry_row = NewPriceEntryRow::new(station_id, branch, entry);
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        conn.transaction(|conn| {
            async move {
                diesel::insert_into(stations::table)
                    .values(&station_row)
                    .on_conflict(stations::id)
                    .do_nothing()
                    .execute(conn)
                    .await?;
                diesel::insert_into(station_branches::table)
                    .values(&branch_row)
                    .on_conflict((
                        station_branches::station_id,
                        station_branches::fuel_type,
                        station_branches::payment_method,
                    ))
                    .do_nothing()
                    .execute(conn)
                    .await?;
                diesel::insert_into(price_entries::table)
                    .values(&entry_row)
                    .execute(conn)
                    .await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(diesel_error)
    }

    async fn retract_price(
        &self,
        station_id: &StationId,
        branch: PriceBranch,
        reported_by: &UserId,
        correlation_id: &CorrelationId,
    ) -> Result<u64, PriceLedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let removed = diesel::delete(
            price_entries::table
                .filter(price_entries::correlation_id.eq(correlation_id.as_uuid()))
                .filter(price_entries::station_id.eq(station_id.as_ref()))
                .filter(price_entries::fuel_type.eq(branch.fuel_type.as_str()))
                .filter(price_entries::payment_method.eq(branch.payment_method.as_str()))
                .filter(price_entries::reported_by.eq(reported_by.as_uuid())),
        )
        .execute(&mut conn)
        .await
        .map_err(diesel_error)?;
        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }

    async fn find_station(
        &self,
        station_id: &StationId,
    ) -> Result<Option<Station>, PriceLedgerRepositoryError> {
        let id = station_id.as_ref().to_owned();
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let rows = conn
            .transaction(|conn| {
                async move {
                    let exists = stations::table
                        .filter(stations::id.eq(&id))
                        .select(stations::id)
                        .first::<String>(conn)
                        .await
                        .optional()?;
                    if exists.is_none() {
                        return Ok(None);
                    }
                    let branches = station_branches::table
                        .filter(station_branches::station_id.eq(&id))
                        .select(StationBranchRow::as_select())
                        .load(conn)
                        .await?;
                    let entries = price_entries::table
                        .filter(price_entries::station_id.eq(&id))
                        .order(price_entries::seq.asc())
                        .select(PriceEntryRow::as_select())
                        .load(conn)
                        .await?;
                    Ok(Some((branches, entries)))
                }
                .scope_boxed()
            })
            .await
            .map_err(diesel_error)?;

        rows.map(|(branches, entries)| assemble_station(station_id.clone(), branches, entries))
            .transpose()
    }

    async fn list_price_correlations(
        &self,
    ) -> Result<Vec<PriceCorrelation>, PriceLedgerRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let rows: Vec<PriceEntryRow> = price_entries::table
            .order(price_entries::seq.asc())
            .select(PriceEntryRow::as_select())
            .load(&mut conn)
            .await
            .map_err(diesel_error)?;
        rows.into_iter()
            .map(|row| row.into_correlation().map_err(PriceLedgerRepositoryError::query))
            .collect()
    }
}
