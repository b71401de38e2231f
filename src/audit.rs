use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::middleware::AuthUser;

pub struct AuditEntry<'a> {
    pub action: &'a str,
    pub resource: &'a str,
    pub resource_id: Option<Uuid>,
    pub detail: Option<serde_json::Value>,
}

/// Record an administrative action. Failures are logged, never surfaced to
/// the caller.
pub async fn write_audit(pool: &PgPool, actor: &AuthUser, entry: &AuditEntry<'_>) {
    if let Err(e) = write_audit_inner(pool, actor, entry).await {
        tracing::warn!(
            error = %e,
            action = entry.action,
            resource = entry.resource,
            "failed to write audit log entry"
        );
    }
}

async fn write_audit_inner(
    pool: &PgPool,
    actor: &AuthUser,
    entry: &AuditEntry<'_>,
) -> Result<(), sqlx::Error> {
    let ip: Option<ipnetwork::IpNetwork> = actor.ip_addr.as_deref().and_then(|s| s.parse().ok());

    sqlx::query(
        r#"
        INSERT INTO audit_log (actor_id, actor_email, action, resource, resource_id, detail, ip_addr)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(actor.user_id())
    .bind(&actor.user.email)
    .bind(entry.action)
    .bind(entry.resource)
    .bind(entry.resource_id)
    .bind(&entry.detail)
    .bind(ip)
    .execute(pool)
    .await?;

    Ok(())
}
