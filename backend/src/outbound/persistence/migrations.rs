//! Embedded schema migrations for the ledger tables.

use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

/// Migrations compiled in from `backend/migrations`.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Failure to connect or to apply a migration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    #[error("failed to connect for migrations: {message}")]
    Connect { message: String },

    #[error("failed to apply migrations: {message}")]
    Apply { message: String },
}

/// Apply every pending migration over a short-lived blocking connection.
///
/// Returns the versions that were applied. Call from
/// `tokio::task::spawn_blocking` when inside a runtime.
pub fn run_pending_migrations(database_url: &str) -> Result<Vec<String>, MigrationError> {
    let mut conn = PgConnection::establish(database_url).map_err(|err| {
        MigrationError::Connect {
            message: err.to_string(),
        }
    })?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| MigrationError::Apply {
            message: err.to_string(),
        })?
        .into_iter()
        .map(|version| version.to_string())
        .collect::<Vec<_>>();
    info!(count = applied.len(), "applied pending migrations");
    Ok(applied)
}
