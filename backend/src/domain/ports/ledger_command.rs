//! Driving port for ledger mutations.
//!
//! Requests arrive as plain strings from whatever routing layer sits in
//! front of the ledger. They are validated into typed submissions before
//! any store is touched.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    CorrelationId, Error, Price, PriceBranch, StationDetails, StationId, StationValidationError,
    UserId,
};

/// Request to record a price observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPriceRequest {
    pub station_id: String,
    pub station_name: String,
    pub station_address: String,
    pub fuel_type: String,
    pub payment_method: String,
    pub price: String,
    pub reporter_id: String,
    pub reported_at: DateTime<Utc>,
}

/// Response to a successful price submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPriceResponse {
    pub correlation_id: CorrelationId,
}

/// Request to retract one earlier price submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetractPriceRequest {
    pub station_id: String,
    pub fuel_type: String,
    pub payment_method: String,
    pub correlation_id: String,
    pub reporter_id: String,
}

/// Outcome of a retraction. Both counts are zero on a repeated call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetractPriceResponse {
    pub prices_removed: u64,
    pub log_entries_removed: u64,
}

/// Request to add or remove a favorite station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRequest {
    pub user_id: String,
    pub station_id: String,
    pub station_name: String,
    pub station_address: String,
}

/// Outcome of adding a favorite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFavoriteResponse {
    /// `false` when the station was already bookmarked.
    pub added: bool,
}

/// Outcome of removing a favorite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveFavoriteResponse {
    /// `false` when there was nothing to remove. Still a success.
    pub removed: bool,
}

/// A validated [`SubmitPriceRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSubmission {
    pub station: StationDetails,
    pub branch: PriceBranch,
    pub price: Price,
    pub reporter_id: UserId,
    pub reported_at: DateTime<Utc>,
}

/// A validated [`RetractPriceRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRetraction {
    pub station_id: StationId,
    pub branch: PriceBranch,
    pub correlation_id: CorrelationId,
    pub reporter_id: UserId,
}

/// A validated [`FavoriteRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteChange {
    pub user_id: UserId,
    pub station: StationDetails,
}

fn station_error(err: StationValidationError) -> Error {
    Error::invalid_field(err.field(), err.to_string())
}

pub(crate) fn parse_user_id(field: &str, raw: &str) -> Result<UserId, Error> {
    UserId::new(raw).map_err(|err| Error::invalid_field(field, err.to_string()))
}

pub(crate) fn parse_station_id(raw: impl Into<String>) -> Result<StationId, Error> {
    StationId::new(raw).map_err(station_error)
}

pub(crate) fn parse_branch(fuel_type: &str, payment_method: &str) -> Result<PriceBranch, Error> {
    PriceBranch::parse(fuel_type, payment_method).map_err(station_error)
}

impl TryFrom<SubmitPriceRequest> for PriceSubmission {
    type Error = Error;

    fn try_from(value: SubmitPriceRequest) -> Result<Self, Self::Error> {
        let branch = parse_branch(&value.fuel_type, &value.payment_method)?;
        let station_id = parse_station_id(value.station_id)?;
        let price = Price::new(value.price).map_err(station_error)?;
        let reporter_id = parse_user_id("reporterId", &value.reporter_id)?;
        Ok(Self {
            station: StationDetails::new(station_id, value.station_name, value.station_address),
            branch,
            price,
            reporter_id,
            reported_at: value.reported_at,
        })
    }
}

impl TryFrom<RetractPriceRequest> for PriceRetraction {
    type Error = Error;

    fn try_from(value: RetractPriceRequest) -> Result<Self, Self::Error> {
        let branch = parse_branch(&value.fuel_type, &value.payment_method)?;
        let station_id = parse_station_id(value.station_id)?;
        let correlation_id = CorrelationId::new(&value.correlation_id)
            .map_err(|err| Error::invalid_field("correlationId", err.to_string()))?;
        let reporter_id = parse_user_id("reporterId", &value.reporter_id)?;
        Ok(Self {
            station_id,
            branch,
            correlation_id,
            reporter_id,
        })
    }
}

impl TryFrom<FavoriteRequest> for FavoriteChange {
    type Error = Error;

    fn try_from(value: FavoriteRequest) -> Result<Self, Self::Error> {
        let user_id = parse_user_id("userId", &value.user_id)?;
        let station_id = parse_station_id(value.station_id)?;
        Ok(Self {
            user_id,
            station: StationDetails::new(station_id, value.station_name, value.station_address),
        })
    }
}

/// Driving port for every ledger write.
///
/// Price submissions and retractions touch both the station ledger and the
/// reporter's activity log under one correlation id. A failure after the
/// first side committed is reported as
/// [`crate::domain::ErrorCode::PartialConsistency`], never as a plain store
/// failure.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerCommand: Send + Sync {
    /// Record a price and log it against the reporter.
    async fn submit_price(&self, request: SubmitPriceRequest)
    -> Result<SubmitPriceResponse, Error>;

    /// Retract a price and its log entry. Safe to retry.
    async fn retract_price(
        &self,
        request: RetractPriceRequest,
    ) -> Result<RetractPriceResponse, Error>;

    /// Bookmark a station and log the event.
    async fn add_favorite(&self, request: FavoriteRequest) -> Result<AddFavoriteResponse, Error>;

    /// Drop a bookmark, if present, and log the event.
    async fn remove_favorite(
        &self,
        request: FavoriteRequest,
    ) -> Result<RemoveFavoriteResponse, Error>;
}

#[cfg(test)]
mod tests {
    //! Request validation coverage.

    use chrono::TimeZone;
    use rstest::{fixture, rstest};
    use serde_json::json;

    use super::*;
    use crate::domain::{ErrorCode, FuelType, PaymentMethod};

    #[fixture]
    fn submit_request() -> SubmitPriceRequest {
        SubmitPriceRequest {
            station_id: "ChIJ-main".to_owned(),
            station_name: "Main Street Gas".to_owned(),
            station_address: "10 Main St".to_owned(),
            fuel_type: "premium".to_owned(),
            payment_method: "credit".to_owned(),
            price: "4.09".to_owned(),
            reporter_id: "3fa85f64-5717-4562-b3fc-2c963f66afa6".to_owned(),
            reported_at: Utc
                .with_ymd_and_hms(2026, 6, 1, 7, 0, 0)
                .single()
                .expect("valid timestamp"),
        }
    }

    #[rstest]
    fn valid_submission_converts(submit_request: SubmitPriceRequest) {
        let submission = PriceSubmission::try_from(submit_request).expect("valid request");
        assert_eq!(
            submission.branch,
            PriceBranch::new(FuelType::Premium, PaymentMethod::Credit)
        );
        assert_eq!(submission.station.name, "Main Street Gas");
        assert_eq!(submission.price.as_ref(), "4.09");
    }

    #[rstest]
    #[case::fuel_type(|r: &mut SubmitPriceRequest| r.fuel_type = "kerosene".into(), "fuelType")]
    #[case::payment_method(|r: &mut SubmitPriceRequest| r.payment_method = "iou".into(), "paymentMethod")]
    #[case::station(|r: &mut SubmitPriceRequest| r.station_id = String::new(), "stationId")]
    #[case::price(|r: &mut SubmitPriceRequest| r.price = " ".into(), "price")]
    #[case::reporter(|r: &mut SubmitPriceRequest| r.reporter_id = "bob".into(), "reporterId")]
    fn invalid_submission_names_the_field(
        mut submit_request: SubmitPriceRequest,
        #[case] corrupt: fn(&mut SubmitPriceRequest),
        #[case] field: &str,
    ) {
        corrupt(&mut submit_request);
        let err = PriceSubmission::try_from(submit_request).expect_err("invalid request");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
        assert_eq!(err.details(), Some(&json!({ "field": field })));
    }

    #[rstest]
    fn retraction_requires_a_uuid_correlation_id() {
        let request = RetractPriceRequest {
            station_id: "ChIJ-main".to_owned(),
            fuel_type: "regular".to_owned(),
            payment_method: "cash".to_owned(),
            correlation_id: "42".to_owned(),
            reporter_id: "3fa85f64-5717-4562-b3fc-2c963f66afa6".to_owned(),
        };
        let err = PriceRetraction::try_from(request).expect_err("invalid correlation id");
        assert_eq!(err.details(), Some(&json!({ "field": "correlationId" })));
    }

    #[rstest]
    fn favorite_request_validates_user_id() {
        let request = FavoriteRequest {
            user_id: "nobody".to_owned(),
            station_id: "ChIJ-main".to_owned(),
            station_name: "Main".to_owned(),
            station_address: "10 Main St".to_owned(),
        };
        let err = FavoriteChange::try_from(request).expect_err("invalid user id");
        assert_eq!(err.details(), Some(&json!({ "field": "userId" })));
    }
}
