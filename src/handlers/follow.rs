// src/handlers/follow.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;

use crate::{
    error::AppError,
    handlers::users::find_user_id_by_username,
    models::follow::{FollowData, FollowListEntry, FollowListParams},
    utils::jwt::Claims,
};

/// Relationship summary between `my_id` and `user_id` plus the user's
/// follower/following counts, in one round trip. With `my_id` absent both
/// flags come back false.
pub async fn get_follow_data(
    pool: &PgPool,
    my_id: Option<i64>,
    user_id: i64,
) -> Result<FollowData, AppError> {
    let data = sqlx::query_as::<_, FollowData>(
        r#"
        SELECT
            EXISTS(SELECT 1 FROM followers WHERE user_id = $1 AND follow_to = $2) AS followed,
            EXISTS(SELECT 1 FROM followers WHERE user_id = $2 AND follow_to = $1) AS following,
            (SELECT COUNT(*) FROM followers WHERE follow_to = $2) AS followers_count,
            (SELECT COUNT(*) FROM followers WHERE user_id = $2) AS following_count
        "#,
    )
    .bind(my_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(data)
}

/// Follow a user. The unique constraint on (user_id, follow_to) makes the
/// duplicate check atomic: zero inserted rows means already followed.
pub async fn follow_user(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let my_id = claims.user_id();

    if id == my_id {
        return Err(AppError::BadRequest("You can't follow yourself".to_string()));
    }

    sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let inserted = sqlx::query(
        "INSERT INTO followers (user_id, follow_to) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(my_id)
    .bind(id)
    .execute(&pool)
    .await?
    .rows_affected();

    if inserted == 0 {
        return Err(AppError::Forbidden("Already followed".to_string()));
    }

    Ok(Json(json!({ "success": true })))
}

/// Unfollow a user. No-op success when not following.
pub async fn unfollow(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    sqlx::query("DELETE FROM followers WHERE user_id = $1 AND follow_to = $2")
        .bind(claims.user_id())
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(Json(json!({ "success": true })))
}

/// Remove one of the requester's own followers.
pub async fn remove_follower(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    sqlx::query("DELETE FROM followers WHERE user_id = $1 AND follow_to = $2")
        .bind(id)
        .bind(claims.user_id())
        .execute(&pool)
        .await?;

    Ok(Json(json!({ "success": true })))
}

/// List the followers of a user, newest edges first, cursor-paginated by
/// edge ID. Each entry carries the requester's relationship flags,
/// computed for the whole page by the two LEFT JOINs.
pub async fn get_followers(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(username): Path<String>,
    Query(params): Query<FollowListParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = find_user_id_by_username(&pool, &username).await?;
    let my_id = claims.user_id();

    let entries = sqlx::query_as::<_, FollowListEntry>(
        r#"
        SELECT f.id AS edge_id, u.id, u.username, u.fullname, u.avatar_dest,
               (mine.user_id IS NOT NULL) AS followed,
               (theirs.user_id IS NOT NULL) AS following
        FROM followers f
        JOIN users u ON f.user_id = u.id
        LEFT JOIN followers mine ON mine.user_id = $2 AND mine.follow_to = u.id
        LEFT JOIN followers theirs ON theirs.user_id = u.id AND theirs.follow_to = $2
        WHERE f.follow_to = $1
          AND ($3::BIGINT IS NULL OR f.id < $3)
        ORDER BY f.id DESC
        LIMIT $4
        "#,
    )
    .bind(user_id)
    .bind(my_id)
    .bind(params.cursor)
    .bind(params.limit())
    .fetch_all(&pool)
    .await?;

    Ok(Json(entries))
}

/// List the users a user follows; same annotations as `get_followers`.
pub async fn get_following(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(username): Path<String>,
    Query(params): Query<FollowListParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = find_user_id_by_username(&pool, &username).await?;
    let my_id = claims.user_id();

    let entries = sqlx::query_as::<_, FollowListEntry>(
        r#"
        SELECT f.id AS edge_id, u.id, u.username, u.fullname, u.avatar_dest,
               (mine.user_id IS NOT NULL) AS followed,
               (theirs.user_id IS NOT NULL) AS following
        FROM followers f
        JOIN users u ON f.follow_to = u.id
        LEFT JOIN followers mine ON mine.user_id = $2 AND mine.follow_to = u.id
        LEFT JOIN followers theirs ON theirs.user_id = u.id AND theirs.follow_to = $2
        WHERE f.user_id = $1
          AND ($3::BIGINT IS NULL OR f.id < $3)
        ORDER BY f.id DESC
        LIMIT $4
        "#,
    )
    .bind(user_id)
    .bind(my_id)
    .bind(params.cursor)
    .bind(params.limit())
    .fetch_all(&pool)
    .await?;

    Ok(Json(entries))
}
