//! Driving port for station price reads.

use async_trait::async_trait;

use crate::domain::{Error, PriceEntry, Station};

/// Result of looking a station up.
///
/// A station nobody has reported yet is a normal answer, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationPrices {
    Reported(Station),
    NoPricesYet,
}

impl StationPrices {
    pub fn station(&self) -> Option<&Station> {
        match self {
            Self::Reported(station) => Some(station),
            Self::NoPricesYet => None,
        }
    }
}

/// Driving port for reading station ledgers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StationPricesQuery: Send + Sync {
    /// Snapshot every branch of a station.
    async fn get_station(&self, station_id: &str) -> Result<StationPrices, Error>;

    /// Most recent entry of one branch.
    ///
    /// Fails with [`crate::domain::ErrorCode::StationNotFound`] when the
    /// station was never reported. Returns `None` when the branch is absent
    /// or every entry in it was retracted.
    async fn latest_price(
        &self,
        station_id: &str,
        fuel_type: &str,
        payment_method: &str,
    ) -> Result<Option<PriceEntry>, Error>;
}
