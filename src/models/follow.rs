use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Relationship summary between the requester and another user.
#[derive(Debug, Default, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FollowData {
    /// Requester follows the user.
    pub followed: bool,
    /// The user follows the requester.
    pub following: bool,
    pub followers_count: i64,
    pub following_count: i64,
}

/// One entry of a followers/following listing, annotated with the
/// requester's relationship to the listed user.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FollowListEntry {
    /// Follower-edge ID, used as the pagination cursor.
    pub edge_id: i64,
    pub id: i64,
    pub username: String,
    pub fullname: Option<String>,
    pub avatar_dest: Option<String>,
    pub followed: bool,
    pub following: bool,
}

/// Query parameters for cursor-paginated follow listings.
#[derive(Debug, Deserialize)]
pub struct FollowListParams {
    /// Edge ID of the last entry seen.
    pub cursor: Option<i64>,
    /// Number of entries to return (default 20, max 100).
    pub limit: Option<i64>,
}

impl FollowListParams {
    pub fn limit(&self) -> i64 {
        self.limit.filter(|l| *l > 0).unwrap_or(20).min(100)
    }
}
