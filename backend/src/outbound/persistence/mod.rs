//! PostgreSQL adapters for the ledger ports, built on Diesel.
//!
//! Connections come from a shared `bb8` pool through `diesel-async`. Row
//! structs (`models.rs`) and table definitions (`schema.rs`) stay private to
//! this module; repositories only translate between rows and domain types.
//!
//! ```ignore
//! use gaswatch::outbound::persistence::{
//!     DbPool, DieselActivityLogRepository, DieselPriceLedgerRepository, PoolConfig,
//! };
//!
//! let pool = DbPool::new(PoolConfig::new(database_url)).await?;
//! let prices = DieselPriceLedgerRepository::new(pool.clone());
//! let activity = DieselActivityLogRepository::new(pool);
//! ```

mod diesel_activity_log_repository;
mod diesel_error_mapping;
mod diesel_price_ledger_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_activity_log_repository::DieselActivityLogRepository;
pub use diesel_price_ledger_repository::DieselPriceLedgerRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
