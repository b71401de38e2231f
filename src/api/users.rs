use axum::extract::{Path, State};
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::audit::{AuditEntry, write_audit};
use crate::auth::middleware::AuthUser;
use crate::error::ApiError;
use crate::model::UserResponse;
use crate::rbac::{Capability, gated};
use crate::service::users::{self, UserEdit};
use crate::store::AppState;
use crate::validation::{self, ValidJson};

#[derive(Debug, Deserialize)]
pub struct EditUserRequest {
    pub id: Uuid,
    pub name: Option<String>,
    /// Absent leaves the role alone; `null` clears it.
    #[serde(default, deserialize_with = "validation::present")]
    pub role: Option<Option<Uuid>>,
    pub active: Option<bool>,
}

pub fn router(state: &AppState) -> Router<AppState> {
    gated(
        Router::new()
            .route("/api/users", get(list_users).put(edit_user))
            .route("/api/users/{id}", delete(deactivate_user)),
        state,
        &[Capability::Admin],
    )
}

async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>, ApiError> {
    Ok(Json(users::list_users(&state.pool).await?))
}

#[tracing::instrument(skip(state, auth, body), fields(target = %body.id), err)]
async fn edit_user(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(body): ValidJson<EditUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if let Some(ref name) = body.name {
        validation::check_name("name", name)?;
    }

    let user = users::edit_user(
        &state.pool,
        body.id,
        UserEdit {
            name: body.name,
            role: body.role,
            active: body.active,
        },
    )
    .await?;

    write_audit(
        &state.pool,
        &auth,
        &AuditEntry {
            action: "user.update",
            resource: "user",
            resource_id: Some(user.id),
            detail: Some(serde_json::json!({
                "role": user.role.as_ref().map(|r| r.id),
                "active": user.active,
            })),
        },
    )
    .await;

    Ok(Json(user))
}

#[tracing::instrument(skip(state, auth), err)]
async fn deactivate_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<axum::http::StatusCode, ApiError> {
    users::deactivate_user(&state.pool, id).await?;

    write_audit(
        &state.pool,
        &auth,
        &AuditEntry {
            action: "user.deactivate",
            resource: "user",
            resource_id: Some(id),
            detail: None,
        },
    )
    .await;

    Ok(axum::http::StatusCode::NO_CONTENT)
}
