//! GasWatch price ledger and activity log engine.

pub mod config;
pub mod domain;
pub mod outbound;
pub mod telemetry;
