use axum::extract::{Path, State};
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::{AuditEntry, write_audit};
use crate::auth::middleware::AuthUser;
use crate::error::ApiError;
use crate::model::Role;
use crate::rbac::{Capability, gated};
use crate::service::roles::{self, NewRole, RoleEdit};
use crate::store::AppState;
use crate::validation::{self, ValidJson};

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub permit_regular_review: bool,
    #[serde(default)]
    pub permit_final_review: bool,
    #[serde(default)]
    pub permit_admin: bool,
}

#[derive(Debug, Deserialize)]
pub struct EditRoleRequest {
    pub id: Uuid,
    pub name: Option<String>,
    pub permit_regular_review: Option<bool>,
    pub permit_final_review: Option<bool>,
    pub permit_admin: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct DeleteRoleResponse {
    pub users_cleared: u64,
    pub applications_removed: u64,
}

pub fn router(state: &AppState) -> Router<AppState> {
    gated(
        Router::new()
            .route("/api/roles", get(list_roles).post(create_role).put(edit_role))
            .route("/api/roles/{id}", delete(delete_role)),
        state,
        &[Capability::Admin],
    )
}

async fn list_roles(State(state): State<AppState>) -> Result<Json<Vec<Role>>, ApiError> {
    Ok(Json(roles::get_all_roles(&state.pool).await?))
}

#[tracing::instrument(skip(state, auth, body), fields(name = %body.name), err)]
async fn create_role(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(body): ValidJson<CreateRoleRequest>,
) -> Result<Json<Role>, ApiError> {
    validation::check_name("name", &body.name)?;

    let role = roles::create_role(
        &state.pool,
        NewRole {
            name: body.name,
            permit_regular_review: body.permit_regular_review,
            permit_final_review: body.permit_final_review,
            permit_admin: body.permit_admin,
        },
    )
    .await?;

    write_audit(
        &state.pool,
        &auth,
        &AuditEntry {
            action: "role.create",
            resource: "role",
            resource_id: Some(role.id),
            detail: Some(serde_json::json!({ "name": role.name })),
        },
    )
    .await;

    Ok(Json(role))
}

#[tracing::instrument(skip(state, auth, body), fields(role_id = %body.id), err)]
async fn edit_role(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(body): ValidJson<EditRoleRequest>,
) -> Result<Json<Role>, ApiError> {
    if let Some(ref name) = body.name {
        validation::check_name("name", name)?;
    }

    let role = roles::edit_role(
        &state.pool,
        body.id,
        RoleEdit {
            name: body.name,
            permit_regular_review: body.permit_regular_review,
            permit_final_review: body.permit_final_review,
            permit_admin: body.permit_admin,
        },
    )
    .await?;

    write_audit(
        &state.pool,
        &auth,
        &AuditEntry {
            action: "role.update",
            resource: "role",
            resource_id: Some(role.id),
            detail: Some(serde_json::to_value(&role).map_err(anyhow::Error::from)?),
        },
    )
    .await;

    Ok(Json(role))
}

#[tracing::instrument(skip(state, auth), err)]
async fn delete_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteRoleResponse>, ApiError> {
    let deleted = roles::delete_role(&state.pool, id).await?;

    write_audit(
        &state.pool,
        &auth,
        &AuditEntry {
            action: "role.delete",
            resource: "role",
            resource_id: Some(id),
            detail: Some(serde_json::json!({
                "users_cleared": deleted.users_cleared,
                "applications_removed": deleted.applications_removed,
            })),
        },
    )
    .await;

    Ok(Json(DeleteRoleResponse {
        users_cleared: deleted.users_cleared,
        applications_removed: deleted.applications_removed,
    }))
}
