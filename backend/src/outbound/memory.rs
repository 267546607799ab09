//! In-process implementation of both ledger ports.
//!
//! Each side lives behind its own `tokio::sync::RwLock`, so every port call
//! is atomic for the document it touches and concurrent appends to one
//! branch both land. Used by the behaviour and integration suites, and
//! usable as a development store when no database is configured.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use pagination::Page;
use tokio::sync::RwLock;

use crate::domain::ports::{
    ActivityLogRepository, ActivityLogRepositoryError, PriceCorrelation, PriceLedgerRepository,
    PriceLedgerRepositoryError,
};
use crate::domain::{
    Activity, ActivityLogEntry, ActivityLogQuery, CorrelationId, Favorite, PriceBranch,
    PriceEntry, Station, StationId, UserAccount, UserId,
};

#[derive(Debug, Clone)]
struct UserRecord {
    account: UserAccount,
    log: Vec<ActivityLogEntry>,
}

/// Shared in-memory ledger. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    stations: Arc<RwLock<HashMap<StationId, Station>>>,
    users: Arc<RwLock<HashMap<UserId, UserRecord>>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user, replacing any existing record with the same id.
    ///
    /// Registration is outside the ledger; this stands in for it.
    pub async fn insert_user(&self, account: UserAccount) {
        let record = UserRecord {
            account,
            log: Vec::new(),
        };
        self.users
            .write()
            .await
            .insert(record.account.id.clone(), record);
    }

    /// Delete a user together with their favorites and log.
    ///
    /// Price entries they reported stay on their stations.
    pub async fn remove_user(&self, user_id: &UserId) -> bool {
        self.users.write().await.remove(user_id).is_some()
    }

    /// A copy of the user's whole log in insertion order.
    pub async fn log_of(&self, user_id: &UserId) -> Option<Vec<ActivityLogEntry>> {
        self.users
            .read()
            .await
            .get(user_id)
            .map(|record| record.log.clone())
    }
}

fn user_not_found(user_id: &UserId) -> ActivityLogRepositoryError {
    ActivityLogRepositoryError::user_not_found(user_id.to_string())
}

#[async_trait]
impl PriceLedgerRepository for InMemoryLedgerStore {
    async fn append_price(
        &self,
        station_id: &StationId,
        branch: PriceBranch,
        entry: &PriceEntry,
    ) -> Result<(), PriceLedgerRepositoryError> {
        let mut stations = self.stations.write().await;
        let station = stations
            .entry(station_id.clone())
            .or_insert_with(|| Station::new(station_id.clone()));
        let duplicate = station
            .branches()
            .flat_map(|(_, entries)| entries)
            .any(|existing| existing.correlation_id == entry.correlation_id);
        if duplicate {
            return Err(PriceLedgerRepositoryError::query(format!(
                "correlation id {} is already recorded",
                entry.correlation_id
            )));
        }
        station.append(branch, entry.clone());
        Ok(())
    }

    async fn retract_price(
        &self,
        station_id: &StationId,
        branch: PriceBranch,
        reported_by: &UserId,
        correlation_id: &CorrelationId,
    ) -> Result<u64, PriceLedgerRepositoryError> {
        let mut stations = self.stations.write().await;
        Ok(stations.get_mut(station_id).map_or(0, |station| {
            station.retract(branch, reported_by, *correlation_id)
        }))
    }

    async fn find_station(
        &self,
        station_id: &StationId,
    ) -> Result<Option<Station>, PriceLedgerRepositoryError> {
        Ok(self.stations.read().await.get(station_id).cloned())
    }

    async fn list_price_correlations(
        &self,
    ) -> Result<Vec<PriceCorrelation>, PriceLedgerRepositoryError> {
        let stations = self.stations.read().await;
        let mut correlations = Vec::new();
        for station in stations.values() {
            for (branch, entries) in station.branches() {
                correlations.extend(entries.iter().map(|entry| PriceCorrelation {
                    correlation_id: entry.correlation_id,
                    station_id: station.id().clone(),
                    branch,
                    user_id: entry.reported_by.clone(),
                    recorded_at: entry.recorded_at,
                }));
            }
        }
        Ok(correlations)
    }
}

#[async_trait]
impl ActivityLogRepository for InMemoryLedgerStore {
    async fn find_account(
        &self,
        user_id: &UserId,
    ) -> Result<Option<UserAccount>, ActivityLogRepositoryError> {
        Ok(self
            .users
            .read()
            .await
            .get(user_id)
            .map(|record| record.account.clone()))
    }

    async fn append_entry(
        &self,
        user_id: &UserId,
        entry: &ActivityLogEntry,
    ) -> Result<(), ActivityLogRepositoryError> {
        let mut users = self.users.write().await;
        let record = users.get_mut(user_id).ok_or_else(|| user_not_found(user_id))?;
        record.log.push(entry.clone());
        Ok(())
    }

    async fn retract_by_correlation(
        &self,
        user_id: &UserId,
        station_id: &StationId,
        branch: PriceBranch,
        correlation_id: &CorrelationId,
    ) -> Result<u64, ActivityLogRepositoryError> {
        let mut users = self.users.write().await;
        let Some(record) = users.get_mut(user_id) else {
            return Ok(0);
        };
        let before = record.log.len();
        record
            .log
            .retain(|entry| !entry.records_price(station_id, branch, *correlation_id));
        Ok(u64::try_from(before - record.log.len()).unwrap_or(u64::MAX))
    }

    async fn add_favorite(
        &self,
        user_id: &UserId,
        favorite: &Favorite,
        entry: &ActivityLogEntry,
    ) -> Result<bool, ActivityLogRepositoryError> {
        let mut users = self.users.write().await;
        let record = users.get_mut(user_id).ok_or_else(|| user_not_found(user_id))?;
        let favorites = &mut record.account.favorites;
        let added = !favorites
            .iter()
            .any(|existing| existing.station.id == favorite.station.id);
        if added {
            favorites.push(favorite.clone());
        }
        record.log.push(entry.clone());
        Ok(added)
    }

    async fn remove_favorite(
        &self,
        user_id: &UserId,
        station_id: &StationId,
        entry: &ActivityLogEntry,
    ) -> Result<bool, ActivityLogRepositoryError> {
        let mut users = self.users.write().await;
        let record = users.get_mut(user_id).ok_or_else(|| user_not_found(user_id))?;
        let favorites = &mut record.account.favorites;
        let before = favorites.len();
        favorites.retain(|existing| existing.station.id != *station_id);
        let removed = favorites.len() < before;
        record.log.push(entry.clone());
        Ok(removed)
    }

    async fn query_log(
        &self,
        user_id: &UserId,
        query: &ActivityLogQuery,
    ) -> Result<Option<Page<ActivityLogEntry>>, ActivityLogRepositoryError> {
        Ok(self
            .users
            .read()
            .await
            .get(user_id)
            .map(|record| query.apply(&record.log)))
    }

    async fn list_price_correlations(
        &self,
    ) -> Result<Vec<PriceCorrelation>, ActivityLogRepositoryError> {
        let users = self.users.read().await;
        let correlations = users
            .iter()
            .flat_map(|(user_id, record)| {
                record.log.iter().filter_map(move |entry| match &entry.activity {
                    Activity::PriceUpdate {
                        correlation_id,
                        branch,
                        ..
                    } => Some(PriceCorrelation {
                        correlation_id: *correlation_id,
                        station_id: entry.station.id.clone(),
                        branch: *branch,
                        user_id: user_id.clone(),
                        recorded_at: entry.occurred_at,
                    }),
                    Activity::AddFavorite | Activity::RemoveFavorite => None,
                })
            })
            .collect();
        Ok(correlations)
    }
}
