use serde::Serialize;
use sqlx::FromRow;

use crate::models::user::SearchedUser;

/// A recent-search row joined with the searched user.
#[derive(Debug, FromRow)]
pub struct RecentSearchRow {
    pub id: i64,
    pub search_user_id: i64,
    pub username: String,
    pub fullname: Option<String>,
    pub avatar_dest: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl RecentSearchRow {
    pub fn into_response(self) -> RecentSearchResponse {
        RecentSearchResponse {
            id: self.id,
            search: SearchedUser {
                id: self.search_user_id,
                username: self.username,
                fullname: self.fullname,
                avatar_dest: self.avatar_dest,
            },
            created_at: self.created_at,
        }
    }
}

/// DTO for one entry of the recent-searches list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentSearchResponse {
    pub id: i64,
    pub search: SearchedUser,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
