// src/utils/media.rs
//
// On-disk layout for uploaded files, rooted at `Config::upload_dir`:
//
//   <root>/<userId>/avatar_<rand>_<ts>.<ext>
//   <root>/<userId>/posts/<userId>_<rand>_<ts>.<ext>
//
// The whole root is served read-only under the `/uploads` URL prefix, and
// `dest` strings stored in the database are those public paths
// (`uploads/<userId>/posts/<file>`). The `<userId>_` filename prefix is the
// ownership tag checked before deletion.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

pub const ALLOWED_POST_MEDIA_TYPES: [&str; 3] = ["image/jpeg", "image/png", "video/mp4"];
pub const ALLOWED_AVATAR_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

/// Per-file upload ceiling (20 MiB).
pub const MAX_FILE_BYTES: usize = 20 * 1024 * 1024;

/// Builds a collision-resistant file name: `<userId>_<rand6>_<unixMillis>.<ext>`.
pub fn media_filename(user_id: i64, ext: &str) -> String {
    let rand = Uuid::new_v4().simple().to_string();
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("{}_{}_{}.{}", user_id, &rand[..6], timestamp, ext)
}

/// Picks a file extension, preferring the client's file name and falling
/// back to the declared content type. Returns `None` for anything outside
/// the allowlist shapes.
pub fn extension_for(content_type: &str, file_name: Option<&str>) -> Option<String> {
    if let Some(name) = file_name {
        if let Some(ext) = name.rsplit('.').next().filter(|e| *e != name) {
            let ext = ext.to_ascii_lowercase();
            if !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Some(ext);
            }
        }
    }
    match content_type {
        "image/jpeg" => Some("jpg".to_string()),
        "image/png" => Some("png".to_string()),
        "video/mp4" => Some("mp4".to_string()),
        _ => None,
    }
}

/// True when `name` is a bare file name carrying `user_id` as its ownership
/// prefix. Path separators and parent references are rejected outright.
pub fn owns_file(user_id: i64, name: &str) -> bool {
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return false;
    }
    matches!(name.split('_').next(), Some(prefix) if prefix == user_id.to_string())
}

pub fn user_dir(upload_dir: &str, user_id: i64) -> PathBuf {
    Path::new(upload_dir).join(user_id.to_string())
}

pub fn posts_dir(upload_dir: &str, user_id: i64) -> PathBuf {
    user_dir(upload_dir, user_id).join("posts")
}

/// Public path stored in the database for a post media file.
pub fn post_media_dest(user_id: i64, name: &str) -> String {
    format!("uploads/{}/posts/{}", user_id, name)
}

/// Public path stored in the database for an avatar file.
pub fn avatar_dest(user_id: i64, name: &str) -> String {
    format!("uploads/{}/{}", user_id, name)
}

/// Maps a stored `dest` back to its on-disk location under `upload_dir`.
/// Returns `None` for paths that do not belong to the uploads tree.
pub fn dest_to_path(upload_dir: &str, dest: &str) -> Option<PathBuf> {
    let rel = dest.strip_prefix("uploads/")?;
    if rel.is_empty() || rel.contains("..") {
        return None;
    }
    Some(Path::new(upload_dir).join(rel))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_carries_owner_prefix() {
        let name = media_filename(42, "jpg");
        assert!(name.starts_with("42_"));
        assert!(name.ends_with(".jpg"));
        assert!(owns_file(42, &name));
        assert!(!owns_file(7, &name));
    }

    #[test]
    fn ownership_check_rejects_traversal() {
        assert!(!owns_file(42, "42_../../etc/passwd"));
        assert!(!owns_file(42, "42/evil.jpg"));
    }

    #[test]
    fn extension_prefers_file_name() {
        assert_eq!(
            extension_for("image/jpeg", Some("photo.JPEG")),
            Some("jpeg".to_string())
        );
        assert_eq!(extension_for("video/mp4", Some("clip")), Some("mp4".to_string()));
        assert_eq!(extension_for("application/zip", None), None);
    }

    #[test]
    fn dest_round_trip() {
        let dest = post_media_dest(42, "42_abc123_17.jpg");
        let path = dest_to_path("/tmp/uploads", &dest).unwrap();
        assert_eq!(
            path,
            Path::new("/tmp/uploads").join("42/posts/42_abc123_17.jpg")
        );
        assert!(dest_to_path("/tmp/uploads", "uploads/../secret").is_none());
        assert!(dest_to_path("/tmp/uploads", "other/42.jpg").is_none());
    }
}
