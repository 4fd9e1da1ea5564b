// src/handlers/upload.rs

use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    config::Config,
    error::AppError,
    utils::{jwt::Claims, media},
};

const MAX_FILES_PER_UPLOAD: usize = 10;

/// Upload post media (multipart field `post_media`, up to 10 files).
/// Returns the generated file names for the client to reference when
/// creating the post.
pub async fn upload_post_media(
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let dir = media::posts_dir(&config.upload_dir, user_id);
    tokio::fs::create_dir_all(&dir).await?;

    let mut names: Vec<String> = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("post_media") {
            continue;
        }
        if names.len() == MAX_FILES_PER_UPLOAD {
            return Err(AppError::BadRequest("Array of media (1-10)".to_string()));
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !media::ALLOWED_POST_MEDIA_TYPES.contains(&content_type.as_str()) {
            return Err(AppError::BadRequest(
                "Only .png, .jpg, .jpeg and .mp4 format allowed!".to_string(),
            ));
        }
        let file_name = field.file_name().map(str::to_string);

        let data = field.bytes().await?;
        if data.len() > media::MAX_FILE_BYTES {
            return Err(AppError::BadRequest("File is too large".to_string()));
        }

        let ext = media::extension_for(&content_type, file_name.as_deref()).ok_or_else(|| {
            AppError::BadRequest("Only .png, .jpg, .jpeg and .mp4 format allowed!".to_string())
        })?;
        let name = media::media_filename(user_id, &ext);
        tokio::fs::write(dir.join(&name), &data).await?;
        names.push(name);
    }

    if names.is_empty() {
        return Err(AppError::BadRequest("Images were not upload".to_string()));
    }

    let files: Vec<_> = names.into_iter().map(|name| json!({ "name": name })).collect();
    Ok(Json(files))
}

/// Delete one uploaded file by name. The `<userId>_` filename prefix is
/// the ownership check.
pub async fn delete_file(
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    if !media::owns_file(user_id, &name) {
        return Err(AppError::Forbidden("No access".to_string()));
    }

    let path = media::posts_dir(&config.upload_dir, user_id).join(&name);
    tokio::fs::remove_file(path)
        .await
        .map_err(|_| AppError::BadRequest("Image was not delete".to_string()))?;

    Ok(Json(json!({ "success": true })))
}

/// Delete several uploaded files at once. All names must pass the
/// ownership check before anything is unlinked.
pub async fn delete_files(
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Json(names): Json<Vec<String>>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    if names.iter().any(|name| !media::owns_file(user_id, name)) {
        return Err(AppError::Forbidden("No access".to_string()));
    }

    let dir = media::posts_dir(&config.upload_dir, user_id);
    for name in &names {
        tokio::fs::remove_file(dir.join(name))
            .await
            .map_err(|_| AppError::BadRequest("Image was not delete".to_string()))?;
    }

    Ok(Json(json!({ "success": true })))
}
