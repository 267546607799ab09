//! `bb8` pool of async Diesel connections shared by the ledger repositories.
//!
//! Both repositories hold a clone of the same [`DbPool`]; checkout failures
//! surface as [`PoolError`] and are mapped to each port's connection error.

use std::time::Duration;

use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};

/// Failure to build the pool or to check a connection out of it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// No connection could be checked out before the timeout, or the
    /// checked-out connection failed validation.
    #[error("failed to get connection from pool: {message}")]
    Checkout { message: String },

    /// The pool could not be created from its [`PoolConfig`].
    #[error("failed to build connection pool: {message}")]
    Build { message: String },
}

impl PoolError {
    /// Checkout failure carrying the driver message.
    pub fn checkout(message: impl Into<String>) -> Self {
        Self::Checkout {
            message: message.into(),
        }
    }

    /// Build failure carrying the driver message.
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
        }
    }

    /// The underlying driver message, without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Checkout { message } | Self::Build { message } => message,
        }
    }
}

/// Sizing and timeout settings for [`DbPool`].
///
/// Defaults are ten connections, two kept idle, and a thirty second
/// checkout timeout.
///
/// ```
/// use std::time::Duration;
/// use gaswatch::outbound::persistence::PoolConfig;
///
/// let config = PoolConfig::new("postgres://ledger@localhost/gaswatch")
///     .with_max_size(4)
///     .with_min_idle(None)
///     .with_connection_timeout(Duration::from_secs(5));
/// assert_eq!(config.max_size(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    database_url: String,
    max_size: u32,
    min_idle: Option<u32>,
    connection_timeout: Duration,
}

impl PoolConfig {
    pub const DEFAULT_MAX_SIZE: u32 = 10;
    pub const DEFAULT_MIN_IDLE: u32 = 2;
    pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_size: Self::DEFAULT_MAX_SIZE,
            min_idle: Some(Self::DEFAULT_MIN_IDLE),
            connection_timeout: Self::DEFAULT_CONNECTION_TIMEOUT,
        }
    }

    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_min_idle(mut self, min_idle: Option<u32>) -> Self {
        self.min_idle = min_idle;
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    pub fn min_idle(&self) -> Option<u32> {
        self.min_idle
    }

    pub fn connection_timeout(&self) -> Duration {
        self.connection_timeout
    }
}

/// Cloneable handle to the shared connection pool.
#[derive(Clone)]
pub struct DbPool {
    inner: Pool<AsyncPgConnection>,
}

impl DbPool {
    /// Build the pool and open the idle connections.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Build`] when the URL is rejected or the initial
    /// connections cannot be opened.
    pub async fn new(config: PoolConfig) -> Result<Self, PoolError> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.database_url);
        let inner = Pool::builder()
            .max_size(config.max_size)
            .min_idle(config.min_idle)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .await
            .map_err(|err| PoolError::build(err.to_string()))?;
        Ok(Self { inner })
    }

    /// Check out a connection, waiting up to the configured timeout.
    pub async fn get(&self) -> Result<PooledConnection<'_, AsyncPgConnection>, PoolError> {
        self.inner
            .get()
            .await
            .map_err(|err| PoolError::checkout(err.to_string()))
    }
}
