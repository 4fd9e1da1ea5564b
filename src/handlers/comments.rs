// src/handlers/comments.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::{FromRow, PgPool};
use validator::Validate;

use crate::{
    error::AppError,
    models::comment::{
        CommentListParams, CommentRow, CommentsPage, CreateCommentRequest, RepliesPage,
    },
    utils::{jwt::Claims, text::clean_text},
};

/// Comment columns selected whenever a comment is rendered: the author,
/// the like count and the requester's like flag ($2 is the requester).
const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.post_id, c.parent_id, c.user_id, c.text, c.created_at,
           u.username, u.avatar_dest,
           (SELECT COUNT(*) FROM comment_likes cl WHERE cl.comment_id = c.id) AS likes_count,
           (mycl.user_id IS NOT NULL) AS liked
    FROM comments c
    JOIN users u ON c.user_id = u.id
    LEFT JOIN comment_likes mycl ON mycl.comment_id = c.id AND mycl.user_id = $2
"#;

#[derive(FromRow)]
struct CommentRef {
    id: i64,
    post_id: i64,
    parent_id: Option<i64>,
    user_id: i64,
}

async fn fetch_comment(
    pool: &PgPool,
    comment_id: i64,
    my_id: i64,
) -> Result<Option<CommentRow>, AppError> {
    let row = sqlx::query_as::<_, CommentRow>(&format!("{COMMENT_SELECT} WHERE c.id = $1"))
        .bind(comment_id)
        .bind(my_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Create a top-level comment on a post.
pub async fn create_comment(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<i64>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id();

    let text = clean_text(&payload.text);
    if text.is_empty() {
        return Err(AppError::BadRequest(
            "Comment must be between 1 and 1000 characters".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    sqlx::query_scalar::<_, i64>("SELECT id FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    let comment_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO comments (post_id, user_id, text) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(post_id)
    .bind(user_id)
    .bind(&text)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE posts SET comments_count = comments_count + 1 WHERE id = $1")
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    let comment = fetch_comment(&pool, comment_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

    Ok((StatusCode::CREATED, Json(comment.into_response(Some(0)))))
}

/// Reply to a comment.
///
/// Replies stay exactly one level deep: replying to a reply attaches the
/// new comment to the reply's top-level parent. The post reference is
/// copied from the target, never taken from the client.
pub async fn reply(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(comment_id): Path<i64>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id();

    let text = clean_text(&payload.text);
    if text.is_empty() {
        return Err(AppError::BadRequest(
            "Comment must be between 1 and 1000 characters".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    let target = sqlx::query_as::<_, CommentRef>(
        "SELECT id, post_id, parent_id, user_id FROM comments WHERE id = $1",
    )
    .bind(comment_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

    let parent_id = target.parent_id.unwrap_or(target.id);

    let reply_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO comments (post_id, user_id, parent_id, text)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(target.post_id)
    .bind(user_id)
    .bind(parent_id)
    .bind(&text)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE posts SET comments_count = comments_count + 1 WHERE id = $1")
        .bind(target.post_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    let reply = fetch_comment(&pool, reply_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

    Ok((StatusCode::CREATED, Json(reply.into_response(None))))
}

/// Delete a comment and its direct replies. Author only.
pub async fn remove_comment(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(comment_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let mut tx = pool.begin().await?;

    let comment = sqlx::query_as::<_, CommentRef>(
        "SELECT id, post_id, parent_id, user_id FROM comments WHERE id = $1",
    )
    .bind(comment_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

    if comment.user_id != user_id {
        return Err(AppError::Forbidden("No access!".to_string()));
    }

    let replies = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments WHERE parent_id = $1")
        .bind(comment_id)
        .fetch_one(&mut *tx)
        .await?;

    // The FK cascade takes the direct replies and all like rows with it.
    sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(comment_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE posts SET comments_count = GREATEST(0, comments_count - $2) WHERE id = $1")
        .bind(comment.post_id)
        .bind(replies + 1)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Json(json!({ "success": true })))
}

/// List a post's top-level comments, newest first, page-numbered.
///
/// Reply counts for the page are collected with a single grouped query
/// over the page's IDs and joined in memory.
pub async fn get_post_comments(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<i64>,
    Query(params): Query<CommentListParams>,
) -> Result<impl IntoResponse, AppError> {
    let my_id = claims.user_id();
    let page = params.page();
    let limit = params.limit();

    let comments_count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM comments WHERE post_id = $1 AND parent_id IS NULL",
    )
    .bind(post_id)
    .fetch_one(&pool)
    .await?;

    let pages = ((comments_count + limit - 1) / limit).max(1);
    if page > pages {
        return Err(AppError::Forbidden(
            "Page number is bigger than possible".to_string(),
        ));
    }

    let rows = sqlx::query_as::<_, CommentRow>(&format!(
        r#"
        {COMMENT_SELECT}
        WHERE c.post_id = $1 AND c.parent_id IS NULL
        ORDER BY c.id DESC
        OFFSET $3 LIMIT $4
        "#
    ))
    .bind(post_id)
    .bind(my_id)
    .bind((page - 1) * limit)
    .bind(limit)
    .fetch_all(&pool)
    .await?;

    let ids: Vec<i64> = rows.iter().map(|c| c.id).collect();
    let reply_counts: HashMap<i64, i64> = sqlx::query_as::<_, (i64, i64)>(
        "SELECT parent_id, COUNT(*) FROM comments WHERE parent_id = ANY($1) GROUP BY parent_id",
    )
    .bind(&ids)
    .fetch_all(&pool)
    .await?
    .into_iter()
    .collect();

    let comments = rows
        .into_iter()
        .map(|row| {
            let count = reply_counts.get(&row.id).copied().unwrap_or(0);
            row.into_response(Some(count))
        })
        .collect();

    Ok(Json(CommentsPage {
        post_id,
        comments,
        pages,
        comments_count,
    }))
}

/// List the replies to a comment, oldest first, page-numbered.
pub async fn get_comment_replies(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(comment_id): Path<i64>,
    Query(params): Query<CommentListParams>,
) -> Result<impl IntoResponse, AppError> {
    let my_id = claims.user_id();
    let page = params.page();
    let limit = params.limit();

    let replies_count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments WHERE parent_id = $1")
            .bind(comment_id)
            .fetch_one(&pool)
            .await?;

    let pages = ((replies_count + limit - 1) / limit).max(1);
    if page > pages {
        return Err(AppError::Forbidden(
            "Page number is bigger than possible".to_string(),
        ));
    }

    let rows = sqlx::query_as::<_, CommentRow>(&format!(
        r#"
        {COMMENT_SELECT}
        WHERE c.parent_id = $1
        ORDER BY c.id ASC
        OFFSET $3 LIMIT $4
        "#
    ))
    .bind(comment_id)
    .bind(my_id)
    .bind((page - 1) * limit)
    .bind(limit)
    .fetch_all(&pool)
    .await?;

    let replies = rows.into_iter().map(|row| row.into_response(None)).collect();

    Ok(Json(RepliesPage {
        parent_id: comment_id,
        replies,
        pages,
        replies_count,
    }))
}

/// Like a comment. Idempotent.
pub async fn add_like(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(comment_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    sqlx::query_scalar::<_, i64>("SELECT id FROM comments WHERE id = $1")
        .bind(comment_id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

    sqlx::query(
        "INSERT INTO comment_likes (user_id, comment_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(comment_id)
    .execute(&pool)
    .await?;

    Ok(Json(json!({ "success": true })))
}

/// Remove a comment like. No-op success when absent.
pub async fn remove_like(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(comment_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    sqlx::query_scalar::<_, i64>("SELECT id FROM comments WHERE id = $1")
        .bind(comment_id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

    sqlx::query("DELETE FROM comment_likes WHERE user_id = $1 AND comment_id = $2")
        .bind(user_id)
        .bind(comment_id)
        .execute(&pool)
        .await?;

    Ok(Json(json!({ "success": true })))
}
