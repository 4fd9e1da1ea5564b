// src/handlers/posts.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    handlers::users::find_user_id_by_username,
    models::post::{
        CreatePostRequest, EditPostRequest, MediaItem, MediaRow, PostListParams, PostResponse,
        PostRow,
    },
    utils::{jwt::Claims, media, text::clean_text},
};

/// Post columns selected by every listing query, together with the author
/// and the requester's interaction flags ($2 is the requester).
const POST_SELECT: &str = r#"
    SELECT p.id, p.user_id, p.text, p.aspect, p.hide_comments, p.hide_likes,
           p.likes_count, p.saves_count, p.comments_count, p.created_at,
           u.username, u.avatar_dest,
           (pl.user_id IS NOT NULL) AS liked,
           (ps.user_id IS NOT NULL) AS saved
    FROM posts p
    JOIN users u ON p.user_id = u.id
    LEFT JOIN post_likes pl ON pl.post_id = p.id AND pl.user_id = $2
    LEFT JOIN post_saves ps ON ps.post_id = p.id AND ps.user_id = $2
"#;

/// Collects the media of a whole page of posts with one bulk query and
/// groups it by post, avoiding a query per post.
async fn media_for_posts(
    pool: &PgPool,
    post_ids: &[i64],
) -> Result<HashMap<i64, Vec<MediaItem>>, AppError> {
    if post_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, MediaRow>(
        r#"
        SELECT post_id, dest, media_type, transform
        FROM post_media
        WHERE post_id = ANY($1)
        ORDER BY post_id, position
        "#,
    )
    .bind(post_ids)
    .fetch_all(pool)
    .await?;

    let mut by_post: HashMap<i64, Vec<MediaItem>> = HashMap::new();
    for row in rows {
        by_post.entry(row.post_id).or_default().push(row.into_item());
    }
    Ok(by_post)
}

async fn attach_media(pool: &PgPool, rows: Vec<PostRow>) -> Result<Vec<PostResponse>, AppError> {
    let ids: Vec<i64> = rows.iter().map(|p| p.id).collect();
    let mut media = media_for_posts(pool, &ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let items = media.remove(&row.id).unwrap_or_default();
            row.into_response(items)
        })
        .collect())
}

async fn fetch_post(
    pool: &PgPool,
    post_id: i64,
    my_id: i64,
) -> Result<Option<PostResponse>, AppError> {
    let row = sqlx::query_as::<_, PostRow>(&format!("{POST_SELECT} WHERE p.id = $1"))
        .bind(post_id)
        .bind(my_id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => {
            let mut media = media_for_posts(pool, &[row.id]).await?;
            let items = media.remove(&row.id).unwrap_or_default();
            Ok(Some(row.into_response(items)))
        }
        None => Ok(None),
    }
}

/// Create a new post from previously uploaded media files.
pub async fn create_post(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id();

    // Every referenced file must carry the caller's ownership prefix.
    for item in &payload.media {
        if !media::owns_file(user_id, &item.name) {
            return Err(AppError::Forbidden("No access".to_string()));
        }
    }

    let text = payload.text.as_deref().map(clean_text).unwrap_or_default();

    let mut tx = pool.begin().await?;

    let post_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO posts (user_id, text, aspect, hide_comments, hide_likes)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(&text)
    .bind(payload.aspect)
    .bind(payload.hide_comments)
    .bind(payload.hide_likes)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create post: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    for (position, item) in payload.media.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO post_media (post_id, dest, media_type, transform, position)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(post_id)
        .bind(media::post_media_dest(user_id, &item.name))
        .bind(&item.media_type)
        .bind(&item.transform)
        .bind(position as i32)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    let post = fetch_post(&pool, post_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    Ok((StatusCode::CREATED, Json(post)))
}

/// Get a single post by ID.
pub async fn get_post(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let post = fetch_post(&pool, id, claims.user_id())
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    Ok(Json(post))
}

/// Edit a post's caption or visibility flags. Author only.
pub async fn edit_post(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<EditPostRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id();

    let owner = sqlx::query_scalar::<_, i64>("SELECT user_id FROM posts WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    if owner != user_id {
        return Err(AppError::Forbidden("No access".to_string()));
    }

    let text = payload.text.as_deref().map(clean_text);

    sqlx::query(
        r#"
        UPDATE posts
        SET text = COALESCE($1, text),
            hide_comments = COALESCE($2, hide_comments),
            hide_likes = COALESCE($3, hide_likes),
            updated_at = NOW()
        WHERE id = $4
        "#,
    )
    .bind(&text)
    .bind(payload.hide_comments)
    .bind(payload.hide_likes)
    .bind(id)
    .execute(&pool)
    .await?;

    let post = fetch_post(&pool, id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    Ok(Json(post))
}

/// Delete a post. Author only. Comments, likes, saves and media rows go
/// with it via foreign keys; media files are unlinked afterwards.
pub async fn delete_post(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let owner = sqlx::query_scalar::<_, i64>("SELECT user_id FROM posts WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    if owner != user_id {
        return Err(AppError::Forbidden("No access".to_string()));
    }

    let dests = sqlx::query_scalar::<_, String>("SELECT dest FROM post_media WHERE post_id = $1")
        .bind(id)
        .fetch_all(&pool)
        .await?;

    sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    for dest in dests {
        if let Some(path) = media::dest_to_path(&config.upload_dir, &dest) {
            let _ = tokio::fs::remove_file(path).await;
        }
    }

    Ok(Json(json!({ "success": true })))
}

/// Home feed: newest posts of the requester and the users they follow,
/// cursor-paginated by post ID.
pub async fn feed(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<PostListParams>,
) -> Result<impl IntoResponse, AppError> {
    let my_id = claims.user_id();
    let limit = params.limit.unwrap_or(20).min(100);

    let rows = sqlx::query_as::<_, PostRow>(&format!(
        r#"
        {POST_SELECT}
        WHERE (p.user_id = $2
               OR p.user_id IN (SELECT follow_to FROM followers WHERE user_id = $2))
          AND ($1::BIGINT IS NULL OR p.id < $1)
        ORDER BY p.id DESC
        LIMIT $3
        "#
    ))
    .bind(params.cursor)
    .bind(my_id)
    .bind(limit)
    .fetch_all(&pool)
    .await?;

    Ok(Json(attach_media(&pool, rows).await?))
}

/// List a user's posts, newest first, cursor-paginated by post ID.
pub async fn get_user_posts(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(username): Path<String>,
    Query(params): Query<PostListParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = find_user_id_by_username(&pool, &username).await?;
    let limit = params.limit.unwrap_or(20).min(100);

    let rows = sqlx::query_as::<_, PostRow>(&format!(
        r#"
        {POST_SELECT}
        WHERE p.user_id = $1
          AND ($3::BIGINT IS NULL OR p.id < $3)
        ORDER BY p.id DESC
        LIMIT $4
        "#
    ))
    .bind(user_id)
    .bind(claims.user_id())
    .bind(params.cursor)
    .bind(limit)
    .fetch_all(&pool)
    .await?;

    Ok(Json(attach_media(&pool, rows).await?))
}

/// List a user's reels: posts containing at least one video.
pub async fn get_user_reels(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(username): Path<String>,
    Query(params): Query<PostListParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = find_user_id_by_username(&pool, &username).await?;
    let limit = params.limit.unwrap_or(20).min(100);

    let rows = sqlx::query_as::<_, PostRow>(&format!(
        r#"
        {POST_SELECT}
        WHERE p.user_id = $1
          AND EXISTS (SELECT 1 FROM post_media pm
                      WHERE pm.post_id = p.id AND pm.media_type = 'video')
          AND ($3::BIGINT IS NULL OR p.id < $3)
        ORDER BY p.id DESC
        LIMIT $4
        "#
    ))
    .bind(user_id)
    .bind(claims.user_id())
    .bind(params.cursor)
    .bind(limit)
    .fetch_all(&pool)
    .await?;

    Ok(Json(attach_media(&pool, rows).await?))
}

/// List the requester's saved posts.
pub async fn get_saved_posts(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<PostListParams>,
) -> Result<impl IntoResponse, AppError> {
    let my_id = claims.user_id();
    let limit = params.limit.unwrap_or(20).min(100);

    let rows = sqlx::query_as::<_, PostRow>(&format!(
        r#"
        {POST_SELECT}
        JOIN post_saves s ON s.post_id = p.id AND s.user_id = $2
        WHERE ($1::BIGINT IS NULL OR p.id < $1)
        ORDER BY p.id DESC
        LIMIT $3
        "#
    ))
    .bind(params.cursor)
    .bind(my_id)
    .bind(limit)
    .fetch_all(&pool)
    .await?;

    Ok(Json(attach_media(&pool, rows).await?))
}

async fn post_exists(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    post_id: i64,
) -> Result<(), AppError> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
    Ok(())
}

/// Like a post. Idempotent: liking twice leaves a single like.
pub async fn add_like(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let mut tx = pool.begin().await?;
    post_exists(&mut tx, post_id).await?;

    let inserted = sqlx::query(
        "INSERT INTO post_likes (user_id, post_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(post_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if inserted > 0 {
        sqlx::query("UPDATE posts SET likes_count = likes_count + 1 WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok(Json(json!({ "success": true })))
}

/// Remove a like. No-op success when the post was never liked.
pub async fn remove_like(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let mut tx = pool.begin().await?;
    post_exists(&mut tx, post_id).await?;

    let removed = sqlx::query("DELETE FROM post_likes WHERE user_id = $1 AND post_id = $2")
        .bind(user_id)
        .bind(post_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if removed > 0 {
        sqlx::query("UPDATE posts SET likes_count = GREATEST(0, likes_count - 1) WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok(Json(json!({ "success": true })))
}

/// Save a post. Idempotent like `add_like`.
pub async fn add_save(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let mut tx = pool.begin().await?;
    post_exists(&mut tx, post_id).await?;

    let inserted = sqlx::query(
        "INSERT INTO post_saves (user_id, post_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(post_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if inserted > 0 {
        sqlx::query("UPDATE posts SET saves_count = saves_count + 1 WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok(Json(json!({ "success": true })))
}

/// Unsave a post. No-op success when not saved.
pub async fn remove_save(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let mut tx = pool.begin().await?;
    post_exists(&mut tx, post_id).await?;

    let removed = sqlx::query("DELETE FROM post_saves WHERE user_id = $1 AND post_id = $2")
        .bind(user_id)
        .bind(post_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if removed > 0 {
        sqlx::query("UPDATE posts SET saves_count = GREATEST(0, saves_count - 1) WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok(Json(json!({ "success": true })))
}
