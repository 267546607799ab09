//! Activity log store: per-user append-only log plus favorites.

use std::sync::Arc;

use pagination::Page;

use crate::domain::ports::{ActivityLogRepository, ActivityLogRepositoryError, PriceCorrelation};
use crate::domain::{
    ActivityLogEntry, ActivityLogQuery, CorrelationId, Error, Favorite, PriceBranch, StationId,
    UserAccount, UserId,
};

fn map_repository_error(error: ActivityLogRepositoryError) -> Error {
    match error {
        ActivityLogRepositoryError::Connection { message } => {
            Error::store_unavailable(format!("activity log unavailable: {message}"))
        }
        ActivityLogRepositoryError::Query { message } => {
            Error::store_failure(format!("activity log error: {message}"))
        }
        ActivityLogRepositoryError::UserNotFound { user_id } => Error::user_not_found(user_id),
    }
}

/// Owns user logs and favorites behind an [`ActivityLogRepository`].
#[derive(Clone)]
pub struct ActivityLogStore<R> {
    repo: Arc<R>,
}

impl<R> ActivityLogStore<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }
}

impl<R> ActivityLogStore<R>
where
    R: ActivityLogRepository,
{
    pub async fn find_account(&self, user_id: &UserId) -> Result<Option<UserAccount>, Error> {
        self.repo
            .find_account(user_id)
            .await
            .map_err(map_repository_error)
    }

    /// Load an account, failing with `UserNotFound` when it is missing.
    pub async fn require_account(&self, user_id: &UserId) -> Result<UserAccount, Error> {
        self.find_account(user_id)
            .await?
            .ok_or_else(|| Error::user_not_found(user_id))
    }

    /// Append one entry. Users are never created here.
    pub async fn append_log(
        &self,
        user_id: &UserId,
        entry: &ActivityLogEntry,
    ) -> Result<(), Error> {
        self.repo
            .append_entry(user_id, entry)
            .await
            .map_err(map_repository_error)
    }

    /// Remove the user's price-update entries with `correlation_id` logged
    /// for `station_id` and `branch`. Idempotent.
    pub async fn retract_log_by_correlation(
        &self,
        user_id: &UserId,
        station_id: &StationId,
        branch: PriceBranch,
        correlation_id: &CorrelationId,
    ) -> Result<u64, Error> {
        self.repo
            .retract_by_correlation(user_id, station_id, branch, correlation_id)
            .await
            .map_err(map_repository_error)
    }

    pub async fn add_favorite(
        &self,
        user_id: &UserId,
        favorite: &Favorite,
        entry: &ActivityLogEntry,
    ) -> Result<bool, Error> {
        self.repo
            .add_favorite(user_id, favorite, entry)
            .await
            .map_err(map_repository_error)
    }

    pub async fn remove_favorite(
        &self,
        user_id: &UserId,
        station_id: &StationId,
        entry: &ActivityLogEntry,
    ) -> Result<bool, Error> {
        self.repo
            .remove_favorite(user_id, station_id, entry)
            .await
            .map_err(map_repository_error)
    }

    /// Filtered, sorted, paginated read. Fails with `UserNotFound`.
    pub async fn query_log(
        &self,
        user_id: &UserId,
        query: &ActivityLogQuery,
    ) -> Result<Page<ActivityLogEntry>, Error> {
        self.repo
            .query_log(user_id, query)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::user_not_found(user_id))
    }

    pub async fn list_price_correlations(&self) -> Result<Vec<PriceCorrelation>, Error> {
        self.repo
            .list_price_correlations()
            .await
            .map_err(map_repository_error)
    }
}
