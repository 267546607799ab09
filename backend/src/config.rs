//! Ledger configuration loaded via OrthoConfig.
//!
//! Values come from CLI flags, `GASWATCH_*` environment variables and an
//! optional config file, in that order of precedence.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::HistoryPaging;
use crate::outbound::persistence::PoolConfig;

/// Settings shared by the ledger binaries.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "GASWATCH")]
pub struct LedgerSettings {
    /// PostgreSQL connection string. Binaries fall back to `DATABASE_URL`.
    pub database_url: Option<String>,
    /// Upper bound on pooled connections.
    #[ortho_config(default = 10)]
    pub pool_max_size: u32,
    /// Connections kept open while idle.
    #[ortho_config(default = 2)]
    pub pool_min_idle: u32,
    /// Seconds to wait for a pooled connection.
    #[ortho_config(default = 30)]
    pub pool_connection_timeout_secs: u64,
    /// History page size used when a request names none.
    #[ortho_config(default = 10)]
    pub default_page_size: u32,
    /// Largest history page a request can ask for.
    #[ortho_config(default = 100)]
    pub max_page_size: u32,
    /// Seconds a price entry may go without its log entry before the audit
    /// reports it.
    #[ortho_config(default = 300)]
    pub audit_grace_period_secs: u64,
}

impl LedgerSettings {
    /// Pool settings for `database_url`.
    pub fn pool_config(&self, database_url: impl Into<String>) -> PoolConfig {
        PoolConfig::new(database_url)
            .with_max_size(self.pool_max_size)
            .with_min_idle(Some(self.pool_min_idle))
            .with_connection_timeout(Duration::from_secs(self.pool_connection_timeout_secs))
    }

    /// Paging limits for history reads.
    ///
    /// A zero maximum is raised to one, and the default page size is kept
    /// within `1..=max_page_size`.
    pub fn history_paging(&self) -> HistoryPaging {
        let max_page_size = self.max_page_size.max(1);
        HistoryPaging {
            default_page_size: self.default_page_size.clamp(1, max_page_size),
            max_page_size,
        }
    }

    /// Grace period for `LedgerAuditService`, saturating at the largest
    /// representable span.
    pub fn audit_grace_period(&self) -> chrono::Duration {
        i64::try_from(self.audit_grace_period_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}
