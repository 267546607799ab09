//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod activity_history_query;
mod activity_log_repository;
mod ledger_command;
mod price_ledger_repository;
mod station_prices_query;

pub use activity_history_query::{
    ActivityHistoryQuery, ActivityHistoryRequest, ActivityHistoryResponse,
};
#[cfg(test)]
pub use activity_history_query::MockActivityHistoryQuery;
#[cfg(test)]
pub use activity_log_repository::MockActivityLogRepository;
pub use activity_log_repository::{
    ActivityLogRepository, ActivityLogRepositoryError, FixtureActivityLogRepository,
};
#[cfg(test)]
pub use ledger_command::MockLedgerCommand;
pub(crate) use ledger_command::{parse_branch, parse_station_id, parse_user_id};
pub use ledger_command::{
    AddFavoriteResponse, FavoriteChange, FavoriteRequest, LedgerCommand, PriceRetraction,
    PriceSubmission, RemoveFavoriteResponse, RetractPriceRequest, RetractPriceResponse,
    SubmitPriceRequest, SubmitPriceResponse,
};
#[cfg(test)]
pub use price_ledger_repository::MockPriceLedgerRepository;
pub use price_ledger_repository::{
    FixturePriceLedgerRepository, PriceCorrelation, PriceLedgerRepository,
    PriceLedgerRepositoryError,
};
#[cfg(test)]
pub use station_prices_query::MockStationPricesQuery;
pub use station_prices_query::{StationPrices, StationPricesQuery};
