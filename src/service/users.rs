use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::model::user::{UserCredentials, UserRow};
use crate::model::{NewUser, UserResponse};

/// Users joined with their role; every query returning `UserResponse` starts here.
const USER_SELECT: &str = r#"
    SELECT u.id, u.email, u.name, u.active, u.created_at,
           r.id AS role_id,
           r.name AS role_name,
           r.permit_regular_review AS role_permit_regular_review,
           r.permit_final_review AS role_permit_final_review,
           r.permit_admin AS role_permit_admin,
           r.created_at AS role_created_at
    FROM users u
    LEFT JOIN roles r ON r.id = u.role_id
"#;

/// Fields an administrator may change on a user. `role: Some(None)` clears
/// the role; `role: None` leaves it untouched.
#[derive(Debug, Default)]
pub struct UserEdit {
    pub name: Option<String>,
    pub role: Option<Option<Uuid>>,
    pub active: Option<bool>,
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserResponse>, ApiError> {
    let row: Option<UserRow> = sqlx::query_as(&format!("{USER_SELECT} WHERE u.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(UserResponse::from))
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<UserResponse>, ApiError> {
    let row: Option<UserRow> = sqlx::query_as(&format!("{USER_SELECT} WHERE u.email = $1"))
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(UserResponse::from))
}

pub async fn find_credentials_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<UserCredentials>, ApiError> {
    let creds = sqlx::query_as("SELECT id, password_hash, active FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(creds)
}

/// Insert a user with no role. A taken email is reported as 409 before the
/// insert; the unique constraint still catches concurrent registrations.
#[tracing::instrument(skip(pool, user), fields(email = %user.email()), err)]
pub async fn create_user(pool: &PgPool, user: NewUser) -> Result<UserResponse, ApiError> {
    let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(user.email())
        .fetch_one(pool)
        .await?;
    if taken {
        return Err(ApiError::Conflict(format!(
            "A user with email '{}' already exists",
            user.email()
        )));
    }

    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (email, password_hash, name, active)
         VALUES ($1, $2, $3, $4)
         RETURNING id",
    )
    .bind(user.email())
    .bind(user.password_hash())
    .bind(user.name())
    .bind(user.active())
    .fetch_one(pool)
    .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user".into()))
}

pub async fn list_users(pool: &PgPool) -> Result<Vec<UserResponse>, ApiError> {
    let rows: Vec<UserRow> = sqlx::query_as(&format!("{USER_SELECT} ORDER BY u.created_at"))
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(UserResponse::from).collect())
}

#[tracing::instrument(skip(pool), err)]
pub async fn edit_user(pool: &PgPool, id: Uuid, edit: UserEdit) -> Result<UserResponse, ApiError> {
    if let Some(Some(role_id)) = edit.role {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM roles WHERE id = $1)")
            .bind(role_id)
            .fetch_one(pool)
            .await?;
        if !exists {
            return Err(ApiError::NotFound("Role does not exist".into()));
        }
    }

    let result = sqlx::query(
        "UPDATE users SET
            name = COALESCE($2, name),
            role_id = CASE WHEN $3 THEN $4 ELSE role_id END,
            active = COALESCE($5, active)
         WHERE id = $1",
    )
    .bind(id)
    .bind(edit.name.as_deref().map(str::trim))
    .bind(edit.role.is_some())
    .bind(edit.role.flatten())
    .bind(edit.active)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("User does not exist".into()));
    }

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User does not exist".into()))
}

/// Users are never deleted, only deactivated. Tokens already issued stop
/// working on the next request.
#[tracing::instrument(skip(pool), err)]
pub async fn deactivate_user(pool: &PgPool, id: Uuid) -> Result<(), ApiError> {
    let result = sqlx::query("UPDATE users SET active = false WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("User does not exist".into()));
    }
    Ok(())
}

#[tracing::instrument(skip(pool, password_hash), err)]
pub async fn set_password(pool: &PgPool, id: Uuid, password_hash: &str) -> Result<(), ApiError> {
    let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("User does not exist".into()));
    }
    Ok(())
}
