//! Outbound adapters implementing the ledger's driven ports.
//!
//! - **memory**: shared in-process store, one lock per side of the ledger.
//! - **persistence**: PostgreSQL repositories built on Diesel.
//!
//! Adapters translate between domain types and storage; they hold no
//! business rules.

pub mod memory;
pub mod persistence;
