use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::user::UserBrief;

/// DTO for creating a comment or a reply.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(
        min = 1,
        max = 1000,
        message = "Comment must be between 1 and 1000 characters"
    ))]
    pub text: String,
}

/// A comment row joined with its author, like count and the requester's
/// like flag.
#[derive(Debug, FromRow)]
pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub user_id: i64,
    pub text: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub username: String,
    pub avatar_dest: Option<String>,
    pub likes_count: i64,
    pub liked: bool,
}

impl CommentRow {
    pub fn into_response(self, replies_count: Option<i64>) -> CommentResponse {
        CommentResponse {
            id: self.id,
            post_id: self.post_id,
            parent_id: self.parent_id,
            text: self.text,
            user: UserBrief {
                username: self.username,
                avatar_dest: self.avatar_dest,
            },
            likes_count: self.likes_count,
            liked: self.liked,
            replies_count,
            created_at: self.created_at,
        }
    }
}

/// DTO for displaying a comment with author info.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: i64,
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub text: String,
    pub user: UserBrief,
    pub likes_count: i64,
    /// Whether the requesting user has liked this comment.
    pub liked: bool,
    /// Only present on top-level comments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies_count: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Query parameters for page-numbered comment listings.
#[derive(Debug, Deserialize)]
pub struct CommentListParams {
    /// 1-based page number (default 1).
    pub page: Option<i64>,
    /// Page size (default 10, max 50).
    pub limit: Option<i64>,
}

impl CommentListParams {
    pub fn page(&self) -> i64 {
        self.page.filter(|p| *p > 0).unwrap_or(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.filter(|l| *l > 0).unwrap_or(10).min(50)
    }
}

/// One page of top-level comments for a post.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentsPage {
    pub post_id: i64,
    pub comments: Vec<CommentResponse>,
    pub pages: i64,
    pub comments_count: i64,
}

/// One page of replies to a comment.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepliesPage {
    pub parent_id: i64,
    pub replies: Vec<CommentResponse>,
    pub pages: i64,
    pub replies_count: i64,
}
