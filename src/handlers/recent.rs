// src/handlers/recent.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::recent_search::{RecentSearchResponse, RecentSearchRow},
    utils::jwt::Claims,
};

/// Record that the requester opened a user from search. Searching the
/// same user again just refreshes the entry's timestamp.
pub async fn add_to_recent(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let my_id = claims.user_id();

    sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    sqlx::query(
        r#"
        INSERT INTO recent_searches (user_id, search_user_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, search_user_id) DO UPDATE SET created_at = NOW()
        "#,
    )
    .bind(my_id)
    .bind(id)
    .execute(&pool)
    .await?;

    Ok(Json(json!({ "success": true })))
}

/// The requester's recent searches, most recent first, capped at 25.
pub async fn get_recents(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let rows = sqlx::query_as::<_, RecentSearchRow>(
        r#"
        SELECT r.id, r.search_user_id, u.username, u.fullname, u.avatar_dest, r.created_at
        FROM recent_searches r
        JOIN users u ON r.search_user_id = u.id
        WHERE r.user_id = $1
        ORDER BY r.created_at DESC
        LIMIT 25
        "#,
    )
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await?;

    let recents: Vec<RecentSearchResponse> =
        rows.into_iter().map(RecentSearchRow::into_response).collect();

    Ok(Json(recents))
}

/// Forget one recent search.
pub async fn remove_recent(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    sqlx::query("DELETE FROM recent_searches WHERE user_id = $1 AND search_user_id = $2")
        .bind(claims.user_id())
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(Json(json!({ "success": true })))
}

/// Clear the whole recent-searches list.
pub async fn remove_all(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    sqlx::query("DELETE FROM recent_searches WHERE user_id = $1")
        .bind(claims.user_id())
        .execute(&pool)
        .await?;

    Ok(Json(json!({ "success": true })))
}
