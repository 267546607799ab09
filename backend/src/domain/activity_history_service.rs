//! Activity history query service.

use std::sync::Arc;

use async_trait::async_trait;
use pagination::{DEFAULT_PAGE_SIZE, PageRequest, PaginationError};

use crate::domain::ports::{
    ActivityHistoryQuery, ActivityHistoryRequest, ActivityHistoryResponse, ActivityLogRepository,
    parse_user_id,
};
use crate::domain::{ActivityFilter, ActivityLogQuery, ActivityLogStore, Error, SortOrder};

/// Largest page a caller can ask for unless configured otherwise.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

/// Page size defaults and limits for history reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryPaging {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for HistoryPaging {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

impl HistoryPaging {
    /// Resolve optional page fields into a validated, clamped request.
    ///
    /// Zero values are rejected; oversized page sizes are capped at
    /// `max_page_size`.
    pub fn page_request(
        &self,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<PageRequest, Error> {
        let request = PageRequest::new(
            page.unwrap_or(1),
            page_size.unwrap_or(self.default_page_size),
        )
        .map_err(|err| {
            let field = match err {
                PaginationError::ZeroPage => "page",
                PaginationError::ZeroPageSize => "pageSize",
            };
            Error::invalid_field(field, err.to_string())
        })?;
        Ok(request.clamp_page_size(self.max_page_size))
    }
}

/// Answers history reads over an [`ActivityLogRepository`].
#[derive(Clone)]
pub struct ActivityHistoryService<A> {
    activity: ActivityLogStore<A>,
    paging: HistoryPaging,
}

impl<A> ActivityHistoryService<A> {
    pub fn new(activity_repo: Arc<A>, paging: HistoryPaging) -> Self {
        Self {
            activity: ActivityLogStore::new(activity_repo),
            paging,
        }
    }
}

#[async_trait]
impl<A> ActivityHistoryQuery for ActivityHistoryService<A>
where
    A: ActivityLogRepository,
{
    async fn history(
        &self,
        request: ActivityHistoryRequest,
    ) -> Result<ActivityHistoryResponse, Error> {
        let user_id = parse_user_id("userId", &request.user_id)?;
        let query = ActivityLogQuery::new(
            ActivityFilter::from_param(request.filter.as_deref()),
            SortOrder::from_param(request.sort.as_deref()),
            self.paging.page_request(request.page, request.page_size)?,
        );

        let account = self.activity.require_account(&user_id).await?;
        let history = self.activity.query_log(&user_id, &query).await?;

        Ok(ActivityHistoryResponse {
            username: account.username,
            favorites: account.favorites,
            history,
        })
    }
}
