//! Reconciliation of the price ledger against activity logs.
//!
//! Every price entry should have exactly one price-update log entry with the
//! same correlation id, and the other way round. A failed dual-write leaves
//! one side behind; the audit finds those orphans and the repair retracts
//! them through the same idempotent operations the coordinator uses.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use mockable::Clock;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::ports::{ActivityLogRepository, PriceCorrelation, PriceLedgerRepository};
use crate::domain::{ActivityLogStore, CorrelationId, Error, PriceObservationStore};

/// Age a price entry must reach before a missing log entry counts against
/// it. Younger entries may belong to a submission still writing its log side.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::minutes(5);

/// Correlation ids present on only one side of the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerAuditReport {
    /// Only price entries stored at or before this instant were judged.
    pub recorded_before: DateTime<Utc>,
    /// Price entries without a matching log entry.
    pub orphaned_prices: Vec<PriceCorrelation>,
    /// Price-update log entries without a matching price entry.
    pub orphaned_log_entries: Vec<PriceCorrelation>,
}

impl LedgerAuditReport {
    pub fn is_consistent(&self) -> bool {
        self.orphaned_prices.is_empty() && self.orphaned_log_entries.is_empty()
    }
}

/// Counts of records removed by [`LedgerAuditService::repair`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairSummary {
    pub prices_retracted: u64,
    pub log_entries_retracted: u64,
    /// Orphans whose missing side appeared between audit and repair.
    pub skipped: u64,
}

/// Finds and removes half-applied dual-writes.
#[derive(Clone)]
pub struct LedgerAuditService<P, A> {
    prices: PriceObservationStore<P>,
    activity: ActivityLogStore<A>,
    clock: Arc<dyn Clock>,
    grace_period: Duration,
}

impl<P, A> LedgerAuditService<P, A> {
    /// `clock` must read the same time source the coordinator stamps
    /// `recorded_at` with.
    pub fn new(price_repo: Arc<P>, activity_repo: Arc<A>, clock: Arc<dyn Clock>) -> Self {
        Self {
            prices: PriceObservationStore::new(price_repo),
            activity: ActivityLogStore::new(activity_repo),
            clock,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    /// Replace [`DEFAULT_GRACE_PERIOD`]. Negative values are treated as zero.
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period.max(Duration::zero());
        self
    }
}

fn correlation_ids(side: &[PriceCorrelation]) -> HashSet<CorrelationId> {
    side.iter().map(|record| record.correlation_id).collect()
}

impl<P, A> LedgerAuditService<P, A>
where
    P: PriceLedgerRepository,
    A: ActivityLogRepository,
{
    /// Compare both sides and list every orphan.
    ///
    /// Price entries stored within the grace period are left out of
    /// `orphaned_prices`; their log entry may not have been written yet.
    pub async fn audit(&self) -> Result<LedgerAuditReport, Error> {
        let recorded_before = self
            .clock
            .utc()
            .checked_sub_signed(self.grace_period)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let priced = self.prices.list_price_correlations().await?;
        let logged = self.activity.list_price_correlations().await?;

        let priced_ids = correlation_ids(&priced);
        let logged_ids = correlation_ids(&logged);

        let report = LedgerAuditReport {
            recorded_before,
            orphaned_prices: priced
                .into_iter()
                .filter(|record| record.recorded_at <= recorded_before)
                .filter(|record| !logged_ids.contains(&record.correlation_id))
                .collect(),
            orphaned_log_entries: logged
                .into_iter()
                .filter(|record| !priced_ids.contains(&record.correlation_id))
                .collect(),
        };
        info!(
            recorded_before = %report.recorded_before,
            orphaned_prices = report.orphaned_prices.len(),
            orphaned_log_entries = report.orphaned_log_entries.len(),
            "ledger audit complete"
        );
        Ok(report)
    }

    /// Retract every orphan in `report` that is still unpartnered.
    ///
    /// Both sides are listed again first, so an orphan whose partner landed
    /// after the audit is skipped. Safe to rerun: orphans that were already
    /// removed count as zero.
    pub async fn repair(&self, report: &LedgerAuditReport) -> Result<RepairSummary, Error> {
        let mut summary = RepairSummary::default();
        if report.is_consistent() {
            return Ok(summary);
        }
        let priced_ids = correlation_ids(&self.prices.list_price_correlations().await?);
        let logged_ids = correlation_ids(&self.activity.list_price_correlations().await?);

        for orphan in &report.orphaned_prices {
            if logged_ids.contains(&orphan.correlation_id) {
                debug!(correlation_id = %orphan.correlation_id, "price entry gained its log entry");
                summary.skipped += 1;
                continue;
            }
            let removed = self
                .prices
                .retract_price(
                    &orphan.station_id,
                    orphan.branch,
                    &orphan.user_id,
                    &orphan.correlation_id,
                )
                .await?;
            if removed > 0 {
                warn!(
                    correlation_id = %orphan.correlation_id,
                    station_id = %orphan.station_id,
                    user_id = %orphan.user_id,
                    "retracted orphaned price entry"
                );
            }
            summary.prices_retracted += removed;
        }
        for orphan in &report.orphaned_log_entries {
            if priced_ids.contains(&orphan.correlation_id) {
                debug!(correlation_id = %orphan.correlation_id, "log entry gained its price entry");
                summary.skipped += 1;
                continue;
            }
            let removed = self
                .activity
                .retract_log_by_correlation(
                    &orphan.user_id,
                    &orphan.station_id,
                    orphan.branch,
                    &orphan.correlation_id,
                )
                .await?;
            if removed > 0 {
                warn!(
                    correlation_id = %orphan.correlation_id,
                    user_id = %orphan.user_id,
                    "retracted orphaned activity log entry"
                );
            }
            summary.log_entries_retracted += removed;
        }
        Ok(summary)
    }
}
