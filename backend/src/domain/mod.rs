//! Domain primitives, ports and services for the price ledger.
//!
//! Purpose: Record fuel price observations per station, keep every reporter's
//! activity log in step with them, and answer filtered history reads. Nothing
//! in this module depends on an adapter or a database crate; storage is
//! reached only through the driven ports in [`ports`].
//!
//! Public surface:
//! - Error / ErrorCode: transport-agnostic failure payload.
//! - Station, PriceBranch, PriceEntry: the per-station price ledger.
//! - ActivityLogEntry, Favorite, UserAccount: the per-user side.
//! - LedgerCoordinator: dual-write entry point (`ports::LedgerCommand`).
//! - ActivityHistoryService: history reads (`ports::ActivityHistoryQuery`).
//! - StationPricesService: station reads (`ports::StationPricesQuery`).
//! - LedgerAuditService: orphan detection and repair.

pub mod activity;
pub mod activity_history_service;
pub mod activity_log_store;
pub mod activity_query;
pub mod correlation;
pub mod error;
pub mod ledger_audit;
pub mod ledger_coordinator;
pub mod ports;
pub mod price_observation_store;
pub mod station;
pub mod station_prices_service;
pub mod user;

pub use self::activity::{Activity, ActivityKind, ActivityLogEntry, Favorite, UnknownActivityKind};
pub use self::activity_history_service::{
    ActivityHistoryService, DEFAULT_MAX_PAGE_SIZE, HistoryPaging,
};
pub use self::activity_log_store::ActivityLogStore;
pub use self::activity_query::{ActivityFilter, ActivityLogQuery, SortOrder};
pub use self::correlation::{CorrelationId, CorrelationIdValidationError};
pub use self::error::{Error, ErrorCode, ErrorValidationError, LedgerSide, PartialWrite};
pub use self::ledger_audit::{
    DEFAULT_GRACE_PERIOD, LedgerAuditReport, LedgerAuditService, RepairSummary,
};
pub use self::ledger_coordinator::LedgerCoordinator;
pub use self::price_observation_store::PriceObservationStore;
pub use self::station::{
    FuelType, PaymentMethod, Price, PriceBranch, PriceEntry, Station, StationDetails, StationId,
    StationValidationError,
};
pub use self::station_prices_service::StationPricesService;
pub use self::user::{UserAccount, UserId, UserValidationError, Username};
