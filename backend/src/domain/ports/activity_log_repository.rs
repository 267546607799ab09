//! Driven port for user accounts, favorites and activity logs.

use async_trait::async_trait;
use pagination::Page;

use crate::domain::{
    ActivityLogEntry, ActivityLogQuery, CorrelationId, Favorite, PriceBranch, StationId,
    UserAccount, UserId,
};

use super::{PriceCorrelation, define_port_error};

define_port_error! {
    /// Errors raised by activity log adapters.
    pub enum ActivityLogRepositoryError {
        /// The backing store could not be reached.
        Connection { message: String } =>
            "activity log repository connection failed: {message}",
        /// A read or write failed during execution.
        Query { message: String } =>
            "activity log repository query failed: {message}",
        /// The user the write targets does not exist.
        UserNotFound { user_id: String } =>
            "user {user_id} does not exist",
    }
}

/// Port for the per-user activity log and favorites.
///
/// Users are never created through this port. Every write that targets a
/// missing user fails with [`ActivityLogRepositoryError::UserNotFound`],
/// except retraction, which removes nothing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivityLogRepository: Send + Sync {
    /// Load a user's identity and favorites.
    async fn find_account(
        &self,
        user_id: &UserId,
    ) -> Result<Option<UserAccount>, ActivityLogRepositoryError>;

    /// Append one entry to the user's log.
    async fn append_entry(
        &self,
        user_id: &UserId,
        entry: &ActivityLogEntry,
    ) -> Result<(), ActivityLogRepositoryError>;

    /// Remove every price-update entry of the user carrying `correlation_id`
    /// that was reported at `station_id` under `branch`.
    ///
    /// Entries logged for another station or branch are kept.
    async fn retract_by_correlation(
        &self,
        user_id: &UserId,
        station_id: &StationId,
        branch: PriceBranch,
        correlation_id: &CorrelationId,
    ) -> Result<u64, ActivityLogRepositoryError>;

    /// Bookmark a station and append `entry` in one atomic step.
    ///
    /// Returns `false` when the station was already a favorite; the existing
    /// bookmark is kept and `entry` is still appended.
    async fn add_favorite(
        &self,
        user_id: &UserId,
        favorite: &Favorite,
        entry: &ActivityLogEntry,
    ) -> Result<bool, ActivityLogRepositoryError>;

    /// Drop a bookmark, if present, and append `entry` in one atomic step.
    ///
    /// Returns whether a bookmark was removed. `entry` is appended either way.
    async fn remove_favorite(
        &self,
        user_id: &UserId,
        station_id: &StationId,
        entry: &ActivityLogEntry,
    ) -> Result<bool, ActivityLogRepositoryError>;

    /// Run a filtered, sorted, paginated read over the user's log.
    ///
    /// Returns `None` when the user does not exist.
    async fn query_log(
        &self,
        user_id: &UserId,
        query: &ActivityLogQuery,
    ) -> Result<Option<Page<ActivityLogEntry>>, ActivityLogRepositoryError>;

    /// Every price-update log entry's correlation id with its location.
    async fn list_price_correlations(
        &self,
    ) -> Result<Vec<PriceCorrelation>, ActivityLogRepositoryError>;
}

/// Fixture implementation in which no user exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureActivityLogRepository;

#[async_trait]
impl ActivityLogRepository for FixtureActivityLogRepository {
    async fn find_account(
        &self,
        _user_id: &UserId,
    ) -> Result<Option<UserAccount>, ActivityLogRepositoryError> {
        Ok(None)
    }

    async fn append_entry(
        &self,
        user_id: &UserId,
        _entry: &ActivityLogEntry,
    ) -> Result<(), ActivityLogRepositoryError> {
        Err(ActivityLogRepositoryError::user_not_found(user_id.as_ref()))
    }

    async fn retract_by_correlation(
        &self,
        _user_id: &UserId,
        _station_id: &StationId,
        _branch: PriceBranch,
        _correlation_id: &CorrelationId,
    ) -> Result<u64, ActivityLogRepositoryError> {
        Ok(0)
    }

    async fn add_favorite(
        &self,
        user_id: &UserId,
        _favorite: &Favorite,
        _entry: &ActivityLogEntry,
    ) -> Result<bool, ActivityLogRepositoryError> {
        Err(ActivityLogRepositoryError::user_not_found(user_id.as_ref()))
    }

    async fn remove_favorite(
        &self,
        user_id: &UserId,
        _station_id: &StationId,
        _entry: &ActivityLogEntry,
    ) -> Result<bool, ActivityLogRepositoryError> {
        Err(ActivityLogRepositoryError::user_not_found(user_id.as_ref()))
    }

    async fn query_log(
        &self,
        _user_id: &UserId,
        _query: &ActivityLogQuery,
    ) -> Result<Option<Page<ActivityLogEntry>>, ActivityLogRepositoryError> {
        Ok(None)
    }

    async fn list_price_correlations(
        &self,
    ) -> Result<Vec<PriceCorrelation>, ActivityLogRepositoryError> {
        Ok(Vec::new())
    }
}
