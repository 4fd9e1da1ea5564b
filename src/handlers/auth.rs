// src/handlers/auth.rs

use axum::{
    Extension, Json,
    extract::{Multipart, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{CheckRequest, LoginRequest, RegisterRequest, User},
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Claims, sign_jwt},
        media,
        text::clean_text,
    },
};

const USER_COLUMNS: &str =
    "id, email, username, password, fullname, bio, avatar_dest, private_account, created_at";

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns the user object (excluding the password hash) and a signed JWT.
pub async fn register(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;
    let fullname = payload.fullname.as_deref().map(clean_text);
    let bio = payload.bio.as_deref().map(clean_text);

    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (email, username, password, fullname, bio, avatar_dest)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(&payload.email)
    .bind(&payload.username)
    .bind(&hashed_password)
    .bind(&fullname)
    .bind(&bio)
    .bind(&payload.avatar_url)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        let msg = e.to_string();
        if msg.contains("users_email_key") {
            AppError::Conflict(format!("Email '{}' already exists", payload.email))
        } else if msg.contains("users_username_key") {
            AppError::Conflict(format!("Username '{}' already exists", payload.username))
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    let token = sign_jwt(user.id, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(json!({
        "user": user,
        "token": token,
    })))
}

/// Authenticates a user and returns a JWT token.
///
/// `login` matches either the email or the username. Unknown login and
/// wrong password answer with the same message.
pub async fn login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1 OR username = $1"
    ))
    .bind(&payload.login)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let user = user.ok_or_else(|| {
        AppError::AuthError("Sorry, your login or password was incorrect.".to_string())
    })?;

    let is_valid = verify_password(&payload.password, &user.password)?;

    if !is_valid {
        return Err(AppError::AuthError(
            "Sorry, your login or password was incorrect.".to_string(),
        ));
    }

    let token = sign_jwt(user.id, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(json!({
        "user": user,
        "token": token,
    })))
}

/// Checks whether an email or username is still available.
pub async fn check_is_free(
    State(pool): State<PgPool>,
    Json(payload): Json<CheckRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.email.is_none() && payload.username.is_none() {
        return Err(AppError::BadRequest("Nothing to check".to_string()));
    }

    let taken = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM users
        WHERE ($1::TEXT IS NOT NULL AND email = $1)
           OR ($2::TEXT IS NOT NULL AND username = $2)
        "#,
    )
    .bind(&payload.email)
    .bind(&payload.username)
    .fetch_one(&pool)
    .await?;

    Ok(Json(json!({ "isFree": taken == 0 })))
}

/// Uploads a new avatar (multipart field `image`, jpeg/png only).
/// Replaces and unlinks the previous avatar file.
pub async fn upload_avatar(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let mut dest: Option<String> = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("image") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !media::ALLOWED_AVATAR_TYPES.contains(&content_type.as_str()) {
            return Err(AppError::BadRequest(
                "Only .png, .jpg and .jpeg format allowed!".to_string(),
            ));
        }
        let file_name = field.file_name().map(str::to_string);

        let data = field.bytes().await?;
        if data.len() > media::MAX_FILE_BYTES {
            return Err(AppError::BadRequest("Image is too large".to_string()));
        }

        let ext = media::extension_for(&content_type, file_name.as_deref()).ok_or_else(|| {
            AppError::BadRequest("Only .png, .jpg and .jpeg format allowed!".to_string())
        })?;
        let name = media::media_filename(user_id, &ext);

        let dir = media::user_dir(&config.upload_dir, user_id);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&name), &data).await?;

        dest = Some(media::avatar_dest(user_id, &name));
        break;
    }

    let dest = dest.ok_or_else(|| AppError::BadRequest("Image was not upload".to_string()))?;

    let old = sqlx::query_scalar::<_, Option<String>>("SELECT avatar_dest FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&pool)
        .await?
        .flatten();

    sqlx::query("UPDATE users SET avatar_dest = $1 WHERE id = $2")
        .bind(&dest)
        .bind(user_id)
        .execute(&pool)
        .await?;

    if let Some(old_dest) = old {
        if let Some(path) = media::dest_to_path(&config.upload_dir, &old_dest) {
            let _ = tokio::fs::remove_file(path).await;
        }
    }

    Ok(Json(json!({ "avatarDest": dest })))
}

/// Removes the current avatar: unlinks the file and clears the column.
pub async fn remove_avatar(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let old = sqlx::query_scalar::<_, Option<String>>("SELECT avatar_dest FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&pool)
        .await?
        .flatten();

    sqlx::query("UPDATE users SET avatar_dest = NULL WHERE id = $1")
        .bind(user_id)
        .execute(&pool)
        .await?;

    if let Some(old_dest) = old {
        if let Some(path) = media::dest_to_path(&config.upload_dir, &old_dest) {
            let _ = tokio::fs::remove_file(path).await;
        }
    }

    Ok(Json(json!({ "success": true })))
}
