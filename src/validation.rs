use axum::extract::FromRequest;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use crate::error::ApiError;

pub const MIN_PASSWORD_LEN: usize = 6;

/// JSON body extractor whose rejections (malformed JSON, missing or mistyped
/// fields) surface as `400 Bad Request` instead of axum's default 422.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ValidJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Deserialize a nullable field so an explicit `null` (`Some(None)`) is
/// distinguished from an absent one (`None`, via `#[serde(default)]`).
pub fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), ApiError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ApiError::BadRequest(format!(
            "{field} must be between {min} and {max} characters (got {len})"
        )));
    }
    Ok(())
}

pub fn check_name(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{field} must not be empty")));
    }
    check_length(field, value, 1, 255)
}

/// Validate an email address and return its normalized (trimmed, lower-cased) form.
pub fn check_email(value: &str) -> Result<String, ApiError> {
    let email = value.trim().to_lowercase();
    check_length("email", &email, 3, 254)?;
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ApiError::BadRequest("invalid email address".into()));
    };
    if local.is_empty()
        || domain.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.chars().any(char::is_whitespace)
    {
        return Err(ApiError::BadRequest("invalid email address".into()));
    }
    Ok(email)
}

pub fn check_password(value: &str) -> Result<(), ApiError> {
    check_length("password", value, MIN_PASSWORD_LEN, 1024)
}

pub fn check_secret(value: &str) -> Result<(), ApiError> {
    check_name("secret", value)
}

/// Parse a UUID and require it to be version 4 (random).
pub fn check_uuid_v4(field: &str, value: &str) -> Result<Uuid, ApiError> {
    let id = Uuid::parse_str(value)
        .map_err(|_| ApiError::BadRequest(format!("{field} must be a UUID")))?;
    if id.get_version_num() != 4 {
        return Err(ApiError::BadRequest(format!("{field} must be a version 4 UUID")));
    }
    Ok(id)
}
