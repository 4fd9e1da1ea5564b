// src/handlers/users.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;

use crate::{
    config::Config,
    error::AppError,
    handlers::follow::get_follow_data,
    models::user::{MeResponse, ProfileResponse, SearchedUser, User},
    utils::{jwt::Claims, media},
};

/// Resolves a username to a user ID, 404 when it does not exist.
pub async fn find_user_id_by_username(pool: &PgPool, username: &str) -> Result<i64, AppError> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Get the current user's own profile, including the email and counts.
pub async fn get_me(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, username, password, fullname, bio, avatar_dest, private_account, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let posts_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&pool)
        .await?;

    let follow_data = get_follow_data(&pool, None, user_id).await?;

    Ok(Json(MeResponse {
        id: user.id,
        email: user.email,
        username: user.username,
        fullname: user.fullname,
        bio: user.bio,
        avatar_dest: user.avatar_dest,
        private_account: user.private_account,
        posts_count,
        followers_count: follow_data.followers_count,
        following_count: follow_data.following_count,
        created_at: user.created_at,
    }))
}

/// Get a public profile by username, with the relationship flags
/// relative to the requesting user.
pub async fn get_profile(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let my_id = claims.user_id();

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, username, password, fullname, bio, avatar_dest, private_account, created_at
        FROM users
        WHERE username = $1
        "#,
    )
    .bind(&username)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let posts_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts WHERE user_id = $1")
        .bind(user.id)
        .fetch_one(&pool)
        .await?;

    let follow_data = get_follow_data(&pool, Some(my_id), user.id).await?;

    Ok(Json(ProfileResponse {
        id: user.id,
        username: user.username,
        fullname: user.fullname,
        bio: user.bio,
        avatar_dest: user.avatar_dest,
        private_account: user.private_account,
        posts_count,
        followers_count: follow_data.followers_count,
        following_count: follow_data.following_count,
        followed: follow_data.followed,
        following: follow_data.following,
    }))
}

/// Search users by username or full name (case-insensitive substring).
pub async fn search_users(
    State(pool): State<PgPool>,
    Path(text): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let pattern = format!("%{}%", text.replace('%', "\\%").replace('_', "\\_"));

    let users = sqlx::query_as::<_, SearchedUser>(
        r#"
        SELECT id, username, fullname, avatar_dest
        FROM users
        WHERE username ILIKE $1 OR fullname ILIKE $1
        ORDER BY username
        LIMIT 20
        "#,
    )
    .bind(&pattern)
    .fetch_all(&pool)
    .await?;

    Ok(Json(users))
}

/// Delete the current user's account.
///
/// Foreign keys cascade the row deletion through posts, media rows,
/// comments, likes, saves, follow edges and recent searches; the user's
/// upload directory is removed afterwards.
pub async fn delete_account(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let dir = media::user_dir(&config.upload_dir, user_id);
    if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove upload dir for user {}: {}", user_id, e);
        }
    }

    Ok(Json(json!({ "success": true })))
}
