//! Station price read service.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::ports::{
    PriceLedgerRepository, StationPrices, StationPricesQuery, parse_branch, parse_station_id,
};
use crate::domain::{Error, PriceEntry, PriceObservationStore};

/// Answers station lookups over a [`PriceLedgerRepository`].
#[derive(Clone)]
pub struct StationPricesService<P> {
    prices: PriceObservationStore<P>,
}

impl<P> StationPricesService<P> {
    pub fn new(price_repo: Arc<P>) -> Self {
        Self {
            prices: PriceObservationStore::new(price_repo),
        }
    }
}

#[async_trait]
impl<P> StationPricesQuery for StationPricesService<P>
where
    P: PriceLedgerRepository,
{
    async fn get_station(&self, station_id: &str) -> Result<StationPrices, Error> {
        let station_id = parse_station_id(station_id)?;
        let prices = match self.prices.get_station(&station_id).await? {
            Some(station) => StationPrices::Reported(station),
            None => StationPrices::NoPricesYet,
        };
        Ok(prices)
    }

    async fn latest_price(
        &self,
        station_id: &str,
        fuel_type: &str,
        payment_method: &str,
    ) -> Result<Option<PriceEntry>, Error> {
        let branch = parse_branch(fuel_type, payment_method)?;
        let station_id = parse_station_id(station_id)?;
        let station = self
            .prices
            .get_station(&station_id)
            .await?
            .ok_or_else(|| Error::station_not_found(&station_id))?;
        Ok(station.latest(branch).cloned())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::domain::ports::MockPriceLedgerRepository;
    use crate::domain::{
        CorrelationId, ErrorCode, FuelType, PaymentMethod, Price, PriceBranch, Station, StationId,
        UserId,
    };

    #[fixture]
    fn reported_station() -> Station {
        let mut station = Station::new(StationId::new("ChIJ-read").expect("valid id"));
        let branch = PriceBranch::new(FuelType::Regular, PaymentMethod::Cash);
        for price in ["3.39", "3.45"] {
            station.append(
                branch,
                PriceEntry {
                    price: Price::new(price).expect("price"),
                    reported_by: UserId::random(),
                    reported_at: Utc::now(),
                    recorded_at: Utc::now(),
                    correlation_id: CorrelationId::random(),
                },
            );
        }
        station.ensure_branch(PriceBranch::new(FuelType::Diesel, PaymentMethod::Cash));
        station
    }

    fn service_returning(
        station: Option<Station>,
    ) -> StationPricesService<MockPriceLedgerRepository> {
        let mut repo = MockPriceLedgerRepository::new();
        repo.expect_find_station()
            .times(1)
            .return_once(move |_| Ok(station));
        StationPricesService::new(Arc::new(repo))
    }

    #[rstest]
    #[tokio::test]
    async fn unknown_station_is_no_prices_yet() {
        let prices = service_returning(None)
            .get_station("ChIJ-read")
            .await
            .expect("lookup succeeds");
        assert_eq!(prices, StationPrices::NoPricesYet);
    }

    #[rstest]
    #[tokio::test]
    async fn latest_price_returns_last_appended(reported_station: Station) {
        let latest = service_returning(Some(reported_station))
            .latest_price("ChIJ-read", "regular", "cash")
            .await
            .expect("lookup succeeds")
            .expect("branch has entries");
        assert_eq!(latest.price.as_ref(), "3.45");
    }

    #[rstest]
    #[case("diesel", "cash")]
    #[case("premium", "credit")]
    #[tokio::test]
    async fn latest_price_is_none_for_empty_or_absent_branches(
        reported_station: Station,
        #[case] fuel_type: &str,
        #[case] payment_method: &str,
    ) {
        let latest = service_returning(Some(reported_station))
            .latest_price("ChIJ-read", fuel_type, payment_method)
            .await
            .expect("lookup succeeds");
        assert!(latest.is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn latest_price_for_unknown_station_is_station_not_found() {
        let err = service_returning(None)
            .latest_price("ChIJ-read", "regular", "cash")
            .await
            .expect_err("no station");
        assert_eq!(err.code(), ErrorCode::StationNotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn malformed_station_id_is_rejected_before_lookup() {
        let service = StationPricesService::new(Arc::new(MockPriceLedgerRepository::new()));
        let err = service.get_station("").await.expect_err("empty id");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }
}
