//! Translation of pool and Diesel failures into port error constructors.
//!
//! Both ledger repositories share these helpers so a closed connection is
//! always reported as a connection error and everything else as a query
//! error, whichever port raised it.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

pub(crate) fn map_pool_error<E>(error: PoolError, connection: impl FnOnce(String) -> E) -> E {
    debug!(error = %error, "connection checkout failed");
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => connection(message),
    }
}

pub(crate) fn map_diesel_error<E>(
    error: DieselError,
    query: impl FnOnce(&'static str) -> E,
    connection: impl FnOnce(&'static str) -> E,
) -> E {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        other => debug!(error = %other, "diesel operation failed"),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _)
        | DieselError::BrokenTransactionManager => connection("database connection error"),
        DieselError::NotFound => query("record not found"),
        DieselError::QueryBuilderError(_) => query("database query error"),
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
            query("referenced record does not exist")
        }
        _ => query("database error"),
    }
}
