use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::model::Role;

const ROLE_COLUMNS: &str =
    "id, name, permit_regular_review, permit_final_review, permit_admin, created_at";

#[derive(Debug)]
pub struct NewRole {
    pub name: String,
    pub permit_regular_review: bool,
    pub permit_final_review: bool,
    pub permit_admin: bool,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Default)]
pub struct RoleEdit {
    pub name: Option<String>,
    pub permit_regular_review: Option<bool>,
    pub permit_final_review: Option<bool>,
    pub permit_admin: Option<bool>,
}

fn duplicate_name(name: &str) -> ApiError {
    ApiError::Conflict(format!("A role named '{name}' already exists"))
}

fn role_missing() -> ApiError {
    ApiError::NotFound("Role does not exist".into())
}

/// Map a unique violation on `roles.name` to the same message as the pre-check.
fn map_unique(err: sqlx::Error, name: &str) -> ApiError {
    if let sqlx::Error::Database(db) = &err
        && db.code().as_deref() == Some("23505")
    {
        return duplicate_name(name);
    }
    err.into()
}

async fn name_taken(pool: &PgPool, name: &str, except: Option<Uuid>) -> Result<bool, ApiError> {
    let taken = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM roles WHERE name = $1 AND id IS DISTINCT FROM $2)",
    )
    .bind(name)
    .bind(except)
    .fetch_one(pool)
    .await?;
    Ok(taken)
}

pub async fn get_all_roles(pool: &PgPool) -> Result<Vec<Role>, ApiError> {
    let roles = sqlx::query_as(&format!("SELECT {ROLE_COLUMNS} FROM roles ORDER BY name"))
        .fetch_all(pool)
        .await?;
    Ok(roles)
}

#[tracing::instrument(skip(pool), err)]
pub async fn create_role(pool: &PgPool, role: NewRole) -> Result<Role, ApiError> {
    let name = role.name.trim();
    if name_taken(pool, name, None).await? {
        return Err(duplicate_name(name));
    }

    sqlx::query_as(&format!(
        "INSERT INTO roles (name, permit_regular_review, permit_final_review, permit_admin)
         VALUES ($1, $2, $3, $4)
         RETURNING {ROLE_COLUMNS}"
    ))
    .bind(name)
    .bind(role.permit_regular_review)
    .bind(role.permit_final_review)
    .bind(role.permit_admin)
    .fetch_one(pool)
    .await
    .map_err(|e| map_unique(e, name))
}

#[tracing::instrument(skip(pool), err)]
pub async fn edit_role(pool: &PgPool, id: Uuid, edit: RoleEdit) -> Result<Role, ApiError> {
    let name = edit.name.as_deref().map(str::trim);
    if let Some(name) = name
        && name_taken(pool, name, Some(id)).await?
    {
        return Err(duplicate_name(name));
    }

    let updated: Option<Role> = sqlx::query_as(&format!(
        "UPDATE roles SET
            name = COALESCE($2, name),
            permit_regular_review = COALESCE($3, permit_regular_review),
            permit_final_review = COALESCE($4, permit_final_review),
            permit_admin = COALESCE($5, permit_admin)
         WHERE id = $1
         RETURNING {ROLE_COLUMNS}"
    ))
    .bind(id)
    .bind(name)
    .bind(edit.permit_regular_review)
    .bind(edit.permit_final_review)
    .bind(edit.permit_admin)
    .fetch_optional(pool)
    .await
    .map_err(|e| map_unique(e, name.unwrap_or_default()))?;

    updated.ok_or_else(role_missing)
}

/// What a role deletion removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleDeletion {
    pub users_cleared: u64,
    pub applications_removed: u64,
}

/// Delete a role atomically. Every user holding it has the role cleared and
/// the role's applications are removed along with it. The pipeline goes
/// with the role through its cascading key.
#[tracing::instrument(skip(pool), err)]
pub async fn delete_role(pool: &PgPool, id: Uuid) -> Result<RoleDeletion, ApiError> {
    let mut tx = pool.begin().await?;

    let locked: Option<Uuid> = sqlx::query_scalar("SELECT id FROM roles WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    if locked.is_none() {
        return Err(role_missing());
    }

    let users_cleared = sqlx::query("UPDATE users SET role_id = NULL WHERE role_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let applications_removed = sqlx::query("DELETE FROM applications WHERE role_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    sqlx::query("DELETE FROM roles WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(role_id = %id, users_cleared, applications_removed, "role deleted");
    Ok(RoleDeletion { users_cleared, applications_removed })
}
