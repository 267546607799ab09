//! Internal Diesel row structs and their conversions to domain types.
//!
//! These types never leave the persistence layer. Conversions back into the
//! domain revalidate every value and report failures as plain strings, which
//! the repositories wrap as query errors.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::ports::PriceCorrelation;
use crate::domain::{
    Activity, ActivityKind, ActivityLogEntry, CorrelationId, Favorite, Price, PriceBranch,
    PriceEntry, StationDetails, StationId, UnknownActivityKind, UserId, Username,
};

use super::schema::{activity_log, favorites, price_entries, station_branches, stations, users};

fn station_id(raw: String) -> Result<StationId, String> {
    StationId::new(raw).map_err(|err| err.to_string())
}

fn branch(fuel_type: &str, payment_method: &str) -> Result<PriceBranch, String> {
    PriceBranch::parse(fuel_type, payment_method).map_err(|err| err.to_string())
}

fn price(raw: String) -> Result<Price, String> {
    Price::new(raw).map_err(|err| err.to_string())
}

// ---------------------------------------------------------------------------
// Users and favorites
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub username: String,
}

impl UserRow {
    pub fn into_parts(self) -> Result<(UserId, Username), String> {
        let username = Username::new(self.username).map_err(|err| err.to_string())?;
        Ok((UserId::from_uuid(self.id), username))
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = favorites)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct FavoriteRow {
    pub station_id: String,
    pub station_name: String,
    pub station_address: String,
    pub added_at: DateTime<Utc>,
}

impl TryFrom<FavoriteRow> for Favorite {
    type Error = String;

    fn try_from(row: FavoriteRow) -> Result<Self, Self::Error> {
        Ok(Self {
            station: StationDetails::new(
                station_id(row.station_id)?,
                row.station_name,
                row.station_address,
            ),
            added_at: row.added_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = favorites)]
pub(crate) struct NewFavoriteRow<'a> {
    pub user_id: Uuid,
    pub station_id: &'a str,
    pub station_name: &'a str,
    pub station_address: &'a str,
    pub added_at: DateTime<Utc>,
}

impl<'a> NewFavoriteRow<'a> {
    pub fn new(user_id: &UserId, favorite: &'a Favorite) -> Self {
        Self {
            user_id: *user_id.as_uuid(),
            station_id: favorite.station.id.as_ref(),
            station_name: &favorite.station.name,
            station_address: &favorite.station.address,
            added_at: favorite.added_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Stations and price entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = stations)]
pub(crate) struct NewStationRow<'a> {
    pub id: &'a str,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = station_branches)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct StationBranchRow {
    pub station_id: String,
    pub fuel_type: String,
    pub payment_method: String,
}

impl StationBranchRow {
    pub fn new(station_id: &StationId, branch: PriceBranch) -> Self {
        Self {
            station_id: station_id.to_string(),
            fuel_type: branch.fuel_type.as_str().to_owned(),
            payment_method: branch.payment_method.as_str().to_owned(),
        }
    }

    pub fn branch(&self) -> Result<PriceBranch, String> {
        branch(&self.fuel_type, &self.payment_method)
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = price_entries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PriceEntryRow {
    pub correlation_id: Uuid,
    pub station_id: String,
    pub fuel_type: String,
    pub payment_method: String,
    pub price: String,
    pub reported_by: Uuid,
    pub reported_at: DateTime<Utc>,
    pub recorded_at: DateTime<Utc>,
}

impl PriceEntryRow {
    pub fn into_branch_entry(self) -> Result<(PriceBranch, PriceEntry), String> {
        let branch = branch(&self.fuel_type, &self.payment_method)?;
        Ok((
            branch,
            PriceEntry {
                price: price(self.price)?,
                reported_by: UserId::from_uuid(self.reported_by),
                reported_at: self.reported_at,
                recorded_at: self.recorded_at,
                correlation_id: CorrelationId::from_uuid(self.correlation_id),
            },
        ))
    }

    pub fn into_correlation(self) -> Result<PriceCorrelation, String> {
        Ok(PriceCorrelation {
            correlation_id: CorrelationId::from_uuid(self.correlation_id),
            branch: branch(&self.fuel_type, &self.payment_method)?,
            station_id: station_id(self.station_id)?,
            user_id: UserId::from_uuid(self.reported_by),
            recorded_at: self.recorded_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = price_entries)]
pub(crate) struct NewPriceEntryRow<'a> {
    pub correlation_id: Uuid,
    pub station_id: &'a str,
    pub fuel_type: &'static str,
    pub payment_method: &'static str,
    pub price: &'a str,
    pub reported_by: Uuid,
    pub reported_at: DateTime<Utc>,
    pub recorded_at: DateTime<Utc>,
}

impl<'a> NewPriceEntryRow<'a> {
    pub fn new(station_id: &'a StationId, branch: PriceBranch, entry: &'a PriceEntry) -> Self {
        Self {
            correlation_id: *entry.correlation_id.as_uuid(),
            station_id: station_id.as_ref(),
            fuel_type: branch.fuel_type.as_str(),
            payment_method: branch.payment_method.as_str(),
            price: entry.price.as_ref(),
            reported_by: *entry.reported_by.as_uuid(),
            reported_at: entry.reported_at,
            recorded_at: entry.recorded_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Activity log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = activity_log)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ActivityLogRow {
    pub kind: String,
    pub station_id: String,
    pub station_name: String,
    pub station_address: String,
    pub occurred_at: DateTime<Utc>,
    pub correlation_id: Option<Uuid>,
    pub fuel_type: Option<String>,
    pub payment_method: Option<String>,
    pub price: Option<String>,
}

impl TryFrom<ActivityLogRow> for ActivityLogEntry {
    type Error = String;

    fn try_from(row: ActivityLogRow) -> Result<Self, Self::Error> {
        let kind: ActivityKind = row
            .kind
            .parse()
            .map_err(|err: UnknownActivityKind| err.to_string())?;
        let activity = match kind {
            ActivityKind::AddFavorite => Activity::AddFavorite,
            ActivityKind::RemoveFavorite => Activity::RemoveFavorite,
            ActivityKind::PriceUpdate => {
                let (Some(correlation_id), Some(fuel_type), Some(payment_method), Some(raw_price)) =
                    (row.correlation_id, row.fuel_type, row.payment_method, row.price)
                else {
                    return Err("price-update log row is missing its report columns".to_owned());
                };
                Activity::PriceUpdate {
                    correlation_id: CorrelationId::from_uuid(correlation_id),
                    branch: branch(&fuel_type, &payment_method)?,
                    price: price(raw_price)?,
                }
            }
        };
        Ok(Self {
            activity,
            station: StationDetails::new(
                station_id(row.station_id)?,
                row.station_name,
                row.station_address,
            ),
            occurred_at: row.occurred_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = activity_log)]
pub(crate) struct NewActivityLogRow<'a> {
    pub user_id: Uuid,
    pub kind: &'static str,
    pub station_id: &'a str,
    pub station_name: &'a str,
    pub station_address: &'a str,
    pub occurred_at: DateTime<Utc>,
    pub correlation_id: Option<Uuid>,
    pub fuel_type: Option<&'static str>,
    pub payment_method: Option<&'static str>,
    pub price: Option<&'a str>,
}

impl<'a> NewActivityLogRow<'a> {
    pub fn new(user_id: &UserId, entry: &'a ActivityLogEntry) -> Self {
        let (correlation_id, fuel_type, payment_method, price) = match &entry.activity {
            Activity::PriceUpdate {
                correlation_id,
                branch,
                price,
            } => (
                Some(*correlation_id.as_uuid()),
                Some(branch.fuel_type.as_str()),
                Some(branch.payment_method.as_str()),
                Some(price.as_ref()),
            ),
            Activity::AddFavorite | Activity::RemoveFavorite => (None, None, None, None),
        };
        Self {
            user_id: *user_id.as_uuid(),
            kind: entry.kind().as_str(),
            station_id: entry.station.id.as_ref(),
            station_name: &entry.station.name,
            station_address: &entry.station.address,
            occurred_at: entry.occurred_at,
            correlation_id,
            fuel_type,
            payment_method,
            price,
        }
    }
}

/// Projection of a price-update log row used by the ledger audit.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = activity_log)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct LoggedCorrelationRow {
    pub user_id: Uuid,
    pub station_id: String,
    pub correlation_id: Option<Uuid>,
    pub fuel_type: Option<String>,
    pub payment_method: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl TryFrom<LoggedCorrelationRow> for PriceCorrelation {
    type Error = String;

    fn try_from(row: LoggedCorrelationRow) -> Result<Self, Self::Error> {
        let (Some(correlation_id), Some(fuel_type), Some(payment_method)) =
            (row.correlation_id, row.fuel_type, row.payment_method)
        else {
            return Err("price-update log row is missing its correlation columns".to_owned());
        };
        Ok(Self {
            correlation_id: CorrelationId::from_uuid(correlation_id),
            station_id: station_id(row.station_id)?,
            branch: branch(&fuel_type, &payment_method)?,
            user_id: UserId::from_uuid(row.user_id),
            recorded_at: row.occurred_at,
        })
    }
}
