//! Driving port for reading a user's activity history.

use async_trait::async_trait;
use pagination::Page;
use serde::{Deserialize, Serialize};

use crate::domain::{ActivityLogEntry, Error, Favorite, Username};

/// Request for one page of a user's history.
///
/// `filter` and `sort` are free text; unrecognised values fall back to
/// "everything" and "newest first". Missing page fields use the configured
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityHistoryRequest {
    pub user_id: String,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
}

impl ActivityHistoryRequest {
    /// First page of everything, newest first.
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }
}

/// A history page composed with the user's current profile data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityHistoryResponse {
    pub username: Username,
    pub favorites: Vec<Favorite>,
    pub history: Page<ActivityLogEntry>,
}

/// Driving port for activity history reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivityHistoryQuery: Send + Sync {
    /// Filter, sort and page the user's log.
    ///
    /// Fails with [`crate::domain::ErrorCode::UserNotFound`] for unknown
    /// users. A user with an empty log gets an empty page and a zero total.
    async fn history(
        &self,
        request: ActivityHistoryRequest,
    ) -> Result<ActivityHistoryResponse, Error>;
}
