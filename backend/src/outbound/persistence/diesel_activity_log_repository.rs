//! PostgreSQL-backed `ActivityLogRepository`.
//!
//! Every write checks that the user exists inside its transaction, so a user
//! deleted mid-request yields `UserNotFound` rather than a foreign key
//! violation. History reads push filtering, ordering and paging down into
//! SQL; `seq` breaks timestamp ties in both directions.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use pagination::Page;
use uuid::Uuid;

use crate::domain::ports::{ActivityLogRepository, ActivityLogRepositoryError, PriceCorrelation};
use crate::domain::{
    ActivityKind, ActivityLogEntry, ActivityLogQuery, CorrelationId, Favorite, PriceBranch,
    SortOrder, StationId, UserAccount, UserId,
};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::{
    ActivityLogRow, FavoriteRow, LoggedCorrelationRow, NewActivityLogRow, NewFavoriteRow, UserRow,
};
use super::pool::{DbPool, PoolError};
use super::schema::{activity_log, favorites, users};

/// Diesel implementation of the activity log port.
#[derive(Clone)]
pub struct DieselActivityLogRepository {
    pool: DbPool,
}

impl DieselActivityLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Failure raised inside a write transaction.
#[derive(Debug)]
enum TxError {
    Diesel(diesel::result::Error),
    UserNotFound,
}

impl From<diesel::result::Error> for TxError {
    fn from(error: diesel::result::Error) -> Self {
        Self::Diesel(error)
    }
}

fn pool_error(error: PoolError) -> ActivityLogRepositoryError {
    map_pool_error(error, |message| ActivityLogRepositoryError::connection(message))
}

fn diesel_error(error: diesel::result::Error) -> ActivityLogRepositoryError {
    map_diesel_error(
        error,
        ActivityLogRepositoryError::query,
        ActivityLogRepositoryError::connection,
    )
}

fn tx_error(error: TxError, user_id: &UserId) -> ActivityLogRepositoryError {
    match error {
        TxError::Diesel(error) => diesel_error(error),
        TxError::UserNotFound => ActivityLogRepositoryError::user_not_found(user_id.to_string()),
    }
}

async fn user_exists(
    conn: &mut AsyncPgConnection,
    user_id: Uuid,
) -> Result<bool, diesel::result::Error> {
    diesel::select(diesel::dsl::exists(
        users::table.filter(users::id.eq(user_id)),
    ))
    .get_result(conn)
    .await
}

async fn require_user(conn: &mut AsyncPgConnection, user_id: Uuid) -> Result<(), TxError> {
    if user_exists(conn, user_id).await? {
        Ok(())
    } else {
        Err(TxError::UserNotFound)
    }
}

fn kind_labels(kinds: &[ActivityKind]) -> Vec<&'static str> {
    kinds.iter().map(|kind| kind.as_str()).collect()
}

#[async_trait]
impl ActivityLogRepository for DieselActivityLogRepository {
    async fn find_account(
        &self,
        user_id: &UserId,
    ) -> Result<Option<UserAccount>, ActivityLogRepositoryError> {
        let uid = *user_id.as_uuid();
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let rows = conn
            .transaction(|conn| {
                async move {
                    let Some(user) = users::table
                        .filter(users::id.eq(uid))
                        .select(UserRow::as_select())
                        .first(conn)
                        .await
                        .optional()?
                    else {
                        return Ok(None);
                    };
                    let bookmarks: Vec<FavoriteRow> = favorites::table
                        .filter(favorites::user_id.eq(uid))
                        .order(favorites::seq.asc())
                        .select(FavoriteRow::as_select())
                        .load(conn)
                        .await?;
                    Ok(Some((user, bookmarks)))
                }
                .scope_boxed()
            })
            .await
            .map_err(diesel_error)?;

        let Some((user, bookmarks)) = rows else {
            return Ok(None);
        };
        let (id, username) = user.into_parts().map_err(ActivityLogRepositoryError::query)?;
        let mut account = UserAccount::new(id, username);
        account.favorites = bookmarks
            .into_iter()
            .map(Favorite::try_from)
            .collect::<Result<_, _>>()
            .map_err(ActivityLogRepositoryError::query)?;
        Ok(Some(account))
    }

    async fn append_entry(
        &self,
        user_id: &UserId,
        entry: &ActivityLogEntry,
    ) -> Result<(), ActivityLogRepositoryError> {
        let uid = *user_id.as_uuid();
        let row = NewActivityLogRow::new(user_id, entry);
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        conn.transaction(|conn| {
            async move {
                require_user(conn, uid).await?;
                diesel::insert_into(activity_log::table)
                    .values(&row)
                    .execute(conn)
                    .await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(|error| tx_error(error, user_id))
    }

    async fn retract_by_correlation(
        &self,
        user_id: &UserId,
        station_id: &StationId,
        branch: PriceBranch,
        correlation_id: &CorrelationId,
    ) -> Result<u64, ActivityLogRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let removed = diesel::delete(
            activity_log::table
                .filter(activity_log::user_id.eq(user_id.as_uuid()))
                .filter(activity_log::correlation_id.eq(correlation_id.as_uuid()))
                .filter(activity_log::kind.eq(ActivityKind::PriceUpdate.as_str()))
                .filter(activity_log::station_id.eq(station_id.as_ref()))
                .filter(activity_log::fuel_type.eq(branch.fuel_type.as_str()))
                .filter(activity_log::payment_method.eq(branch.payment_method.as_str())),
        )
        .execute(&mut conn)
        .await
        .map_err(diesel_error)?;
        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }

    async fn add_favorite(
        &self,
        user_id: &UserId,
        favorite: &Favorite,
        entry: &ActivityLogEntry,
    ) -> Result<bool, ActivityLogRepositoryError> {
        let uid = *user_id.as_uuid();
        let bookmark = NewFavoriteRow::new(user_id, favorite);
        let row = NewActivityLogRow::new(user_id, entry);
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        conn.transaction(|conn| {
            async move {
                require_user(conn, uid).await?;
                let inserted = diesel::insert_into(favorites::table)
                    .values(&bookmark)
                    .on_conflict((favorites::user_id, favorites::station_id))
                    .do_nothing()
                    .execute(conn)
                    .await?;
                diesel::insert_into(activity_log::table)
                    .values(&row)
                    .execute(conn)
                    .await?;
                Ok(inserted > 0)
            }
            .scope_boxed()
        })
        .await
        .map_err(|error| tx_error(error, user_id))
    }

    async fn remove_favorite(
        &self,
        user_id: &UserId,
        station_id: &StationId,
        entry: &ActivityLogEntry,
    ) -> Result<bool, ActivityLogRepositoryError> {
        let uid = *user_id.as_uuid();
        let station = station_id.as_ref().to_owned();
        let row = NewActivityLogRow::new(user_id, entry);
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        conn.transaction(|conn| {
            async move {
                require_user(conn, uid).await?;
                let removed = diesel::delete(
                    favorites::table
                        .filter(favorites::user_id.eq(uid))
                        .filter(favorites::station_id.eq(&station)),
                )
                .execute(conn)
                .await?;
                diesel::insert_into(activity_log::table)
                    .values(&row)
                    .execute(conn)
                    .await?;
                Ok(removed > 0)
            }
            .scope_boxed()
        })
        .await
        .map_err(|error| tx_error(error, user_id))
    }

    async fn query_log(
        &self,
        user_id: &UserId,
        query: &ActivityLogQuery,
    ) -> Result<Option<Page<ActivityLogEntry>>, ActivityLogRepositoryError> {
        let uid = *user_id.as_uuid();
        let query = *query;
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let rows = conn
            .transaction(|conn| {
                async move {
                    if !user_exists(conn, uid).await? {
                        return Ok(None);
                    }
                    let total: i64 = activity_log::table
                        .filter(activity_log::user_id.eq(uid))
                        .filter(activity_log::kind.eq_any(kind_labels(query.filter.kinds())))
                        .count()
                        .get_result(conn)
                        .await?;
                    let page = activity_log::table
                        .filter(activity_log::user_id.eq(uid))
                        .filter(activity_log::kind.eq_any(kind_labels(query.filter.kinds())))
                        .select(ActivityLogRow::as_select())
                        .into_boxed();
                    let page = match query.order {
                        SortOrder::Ascending => page
                            .order((activity_log::occurred_at.asc(), activity_log::seq.asc())),
                        SortOrder::Descending => page
                            .order((activity_log::occurred_at.desc(), activity_log::seq.desc())),
                    };
                    let rows: Vec<ActivityLogRow> = page
                        .limit(i64::from(query.page.page_size()))
                        .offset(i64::try_from(query.page.offset()).unwrap_or(i64::MAX))
                        .load(conn)
                        .await?;
                    Ok(Some((total, rows)))
                }
                .scope_boxed()
            })
            .await
            .map_err(diesel_error)?;

        let Some((total, rows)) = rows else {
            return Ok(None);
        };
        let items = rows
            .into_iter()
            .map(ActivityLogEntry::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(ActivityLogRepositoryError::query)?;
        Ok(Some(Page::new(
            items,
            u64::try_from(total).unwrap_or_default(),
            query.page,
        )))
    }

    async fn list_price_correlations(
        &self,
    ) -> Result<Vec<PriceCorrelation>, ActivityLogRepositoryError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let rows: Vec<LoggedCorrelationRow> = activity_log::table
            .filter(activity_log::kind.eq(ActivityKind::PriceUpdate.as_str()))
            .order(activity_log::seq.asc())
            .select(LoggedCorrelationRow::as_select())
            .load(&mut conn)
            .await
            .map_err(diesel_error)?;
        rows.into_iter()
            .map(|row| PriceCorrelation::try_from(row).map_err(ActivityLogRepositoryError::query))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::domain::ActivityFilter;

    #[rstest]
    #[case(ActivityFilter::All, vec!["price-update", "add-favorite", "remove-favorite"])]
    #[case(ActivityFilter::FavoritesOnly, vec!["add-favorite", "remove-favorite"])]
    #[case(ActivityFilter::PricesOnly, vec!["price-update"])]
    fn filters_push_down_as_kind_labels(
        #[case] filter: ActivityFilter,
        #[case] expected: Vec<&'static str>,
    ) {
        let mut labels = kind_labels(filter.kinds());
        labels.sort_unstable();
        let mut expected = expected;
        expected.sort_unstable();
        assert_eq!(labels, expected);
    }

    #[rstest]
    fn missing_user_in_transaction_names_the_user() {
        let user_id = UserId::random();
        let error = tx_error(TxError::UserNotFound, &user_id);
        assert_eq!(
            error,
            ActivityLogRepositoryError::user_not_found(user_id.to_string())
        );
    }

    #[rstest]
    fn diesel_failures_in_transaction_map_to_query_errors() {
        let error = tx_error(TxError::from(diesel::result::Error::NotFound), &UserId::random());
        assert!(matches!(error, ActivityLogRepositoryError::Query { .. }));
    }

    #[rstest]
    fn checkout_failures_map_to_connection_errors() {
        let error = pool_error(PoolError::checkout("pool exhausted"));
        assert_eq!(error, ActivityLogRepositoryError::connection("pool exhausted"));
    }
}
