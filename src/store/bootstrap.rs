use sqlx::PgPool;
use uuid::Uuid;

use crate::model::NewUser;

/// Name of the role created on first run. It carries every capability.
pub const ADMIN_ROLE: &str = "Admin";
const DEFAULT_ADMIN_PASSWORD: &str = "admin";

/// Seed an all-capability role and an admin account holding it when the
/// database has no users yet. A no-op on every later start.
#[tracing::instrument(skip(pool, admin_password), err)]
pub async fn run(pool: &PgPool, admin_email: &str, admin_password: Option<&str>) -> anyhow::Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;

    if count > 0 {
        tracing::info!("bootstrap skipped, users already exist");
        return Ok(());
    }

    tracing::info!("first run detected, bootstrapping admin account");

    if admin_password.is_none() {
        tracing::warn!("OKTAVIAN_ADMIN_PASSWORD not set, using the default admin password");
    }
    let admin = NewUser::new(
        "Administrator",
        &admin_email.trim().to_lowercase(),
        admin_password.unwrap_or(DEFAULT_ADMIN_PASSWORD),
        true,
    )?;

    let mut tx = pool.begin().await?;

    let role_id: Uuid = sqlx::query_scalar(
        "INSERT INTO roles (name, permit_regular_review, permit_final_review, permit_admin)
         VALUES ($1, true, true, true)
         ON CONFLICT (name) DO UPDATE
             SET permit_regular_review = true, permit_final_review = true, permit_admin = true
         RETURNING id",
    )
    .bind(ADMIN_ROLE)
    .fetch_one(&mut *tx)
    .await?;

    let admin_id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (email, password_hash, name, role_id, active)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id",
    )
    .bind(admin.email())
    .bind(admin.password_hash())
    .bind(admin.name())
    .bind(role_id)
    .bind(admin.active())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(user_id = %admin_id, email = %admin.email(), "admin user created");
    Ok(())
}
