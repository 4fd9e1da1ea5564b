use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::user::UserBrief;

/// One media item of a post, as stored and as served.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MediaItem {
    /// Public path under `/uploads`.
    pub dest: String,
    #[serde(rename = "type")]
    pub media_type: String,
    /// CSS transform applied by the client when rendering.
    pub transform: String,
}

/// Media row joined with its owning post, used when collecting media for a
/// whole page of posts in one query.
#[derive(Debug, FromRow)]
pub struct MediaRow {
    pub post_id: i64,
    pub dest: String,
    pub media_type: String,
    pub transform: String,
}

impl MediaRow {
    pub fn into_item(self) -> MediaItem {
        MediaItem {
            dest: self.dest,
            media_type: self.media_type,
            transform: self.transform,
        }
    }
}

/// A post row joined with its author and the requester's interaction flags.
#[derive(Debug, FromRow)]
pub struct PostRow {
    pub id: i64,
    pub user_id: i64,
    pub text: String,
    pub aspect: f64,
    pub hide_comments: bool,
    pub hide_likes: bool,
    pub likes_count: i32,
    pub saves_count: i32,
    pub comments_count: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub username: String,
    pub avatar_dest: Option<String>,
    pub liked: bool,
    pub saved: bool,
}

impl PostRow {
    pub fn into_response(self, media: Vec<MediaItem>) -> PostResponse {
        PostResponse {
            id: self.id,
            user: UserBrief {
                username: self.username,
                avatar_dest: self.avatar_dest,
            },
            text: self.text,
            aspect: self.aspect,
            media,
            hide_comments: self.hide_comments,
            hide_likes: self.hide_likes,
            likes_count: self.likes_count,
            saves_count: self.saves_count,
            comments_count: self.comments_count,
            liked: self.liked,
            saved: self.saved,
            created_at: self.created_at,
        }
    }
}

/// DTO for displaying a post.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: i64,
    pub user: UserBrief,
    pub text: String,
    pub aspect: f64,
    pub media: Vec<MediaItem>,
    pub hide_comments: bool,
    pub hide_likes: bool,
    pub likes_count: i32,
    pub saves_count: i32,
    pub comments_count: i32,
    /// Whether the requesting user has liked this post.
    pub liked: bool,
    /// Whether the requesting user has saved this post.
    pub saved: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// One media entry of a create-post request. `name` is a file name
/// previously returned by the upload endpoint.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct MediaInput {
    #[validate(length(min = 1, max = 255, message = "Invalid media name"))]
    pub name: String,

    #[serde(rename = "type")]
    #[validate(custom(function = validate_media_type))]
    pub media_type: String,

    #[serde(default)]
    #[validate(length(max = 255, message = "Invalid transform"))]
    pub transform: String,
}

/// DTO for creating a new post.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[validate(length(max = 2200, message = "Caption is too long"))]
    pub text: Option<String>,

    pub aspect: f64,

    #[validate(length(min = 1, max = 10, message = "Array of media (1-10)"), nested)]
    pub media: Vec<MediaInput>,

    #[serde(default)]
    pub hide_comments: bool,

    #[serde(default)]
    pub hide_likes: bool,
}

/// DTO for editing a post. Media cannot be changed after creation.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EditPostRequest {
    #[validate(length(max = 2200, message = "Caption is too long"))]
    pub text: Option<String>,
    pub hide_comments: Option<bool>,
    pub hide_likes: Option<bool>,
}

/// Query parameters for cursor-paginated post listings.
#[derive(Debug, Deserialize)]
pub struct PostListParams {
    /// ID of the last post seen; the next page starts strictly below it.
    pub cursor: Option<i64>,

    /// Number of items to return (default: 20, max: 100).
    pub limit: Option<i64>,
}

fn validate_media_type(media_type: &str) -> Result<(), validator::ValidationError> {
    match media_type {
        "image" | "video" => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_media_type")),
    }
}
