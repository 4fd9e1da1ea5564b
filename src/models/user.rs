// src/models/user.rs

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use url::Url;
use validator::Validate;

/// Lowercase letters and digits, with single '.', '_' or '-' separators.
static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+([._-]?[a-z0-9]+)*$").unwrap());

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,

    /// Unique email address.
    pub email: String,

    /// Unique username.
    pub username: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    pub fullname: Option<String>,
    pub bio: Option<String>,

    /// Public path of the avatar file under `/uploads`.
    pub avatar_dest: Option<String>,

    pub private_account: bool,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Author info embedded in post and comment responses.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserBrief {
    pub username: String,
    pub avatar_dest: Option<String>,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email"))]
    pub email: String,

    #[validate(
        length(min = 2, max = 30, message = "Username length must be between 2 and 30 characters"),
        regex(
            path = *USERNAME_RE,
            message = "Can start and finish with small letter, includes numbers, small letters and symbols('.', '_', '-')"
        )
    )]
    pub username: String,

    #[validate(custom(function = validate_password_strength))]
    pub password: String,

    #[validate(length(max = 80, message = "Full name is too long"))]
    pub fullname: Option<String>,

    #[validate(length(max = 150, message = "Bio is too long"))]
    pub bio: Option<String>,

    #[validate(custom(function = validate_url_string))]
    pub avatar_url: Option<String>,
}

/// DTO for user login. `login` matches either email or username.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 254))]
    pub login: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for the username/email availability check.
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub email: Option<String>,
    pub username: Option<String>,
}

/// A row returned by the username search.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SearchedUser {
    pub id: i64,
    pub username: String,
    pub fullname: Option<String>,
    pub avatar_dest: Option<String>,
}

/// Public profile with aggregate counts and the relationship flags
/// relative to the requesting user.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: i64,
    pub username: String,
    pub fullname: Option<String>,
    pub bio: Option<String>,
    pub avatar_dest: Option<String>,
    pub private_account: bool,
    pub posts_count: i64,
    pub followers_count: i64,
    pub following_count: i64,
    /// Whether the requester follows this user.
    pub followed: bool,
    /// Whether this user follows the requester.
    pub following: bool,
}

/// The requester's own profile; includes the email.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub fullname: Option<String>,
    pub bio: Option<String>,
    pub avatar_dest: Option<String>,
    pub private_account: bool,
    pub posts_count: i64,
    pub followers_count: i64,
    pub following_count: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Minimum eight characters with at least one uppercase letter, one
/// lowercase letter, one digit and one special character. The regex crate
/// has no lookahead, so the rule is spelled out.
fn validate_password_strength(password: &str) -> Result<(), validator::ValidationError> {
    let long_enough = password.len() >= 8 && password.len() <= 128;
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| "@$!%*?&#".contains(c));

    if long_enough && has_lower && has_upper && has_digit && has_special {
        Ok(())
    } else {
        Err(validator::ValidationError::new("weak_password"))
    }
}

fn validate_url_string(url: &str) -> Result<(), validator::ValidationError> {
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}
