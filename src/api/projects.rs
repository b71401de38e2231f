use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::audit::{AuditEntry, write_audit};
use crate::auth::middleware::AuthUser;
use crate::error::ApiError;
use crate::model::Project;
use crate::rbac::{Capability, gated};
use crate::service::projects::{self, NewProject, ProjectEdit};
use crate::store::AppState;
use crate::validation::{self, ValidJson};

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
    pub project_manager: Option<Uuid>,
    #[serde(default)]
    pub outreach: Vec<Uuid>,
    #[serde(default)]
    pub designers: Vec<Uuid>,
    #[serde(default)]
    pub developers: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct EditProjectRequest {
    pub name: Option<String>,
    /// Absent leaves the description alone; `null` clears it.
    #[serde(default, deserialize_with = "validation::present")]
    pub description: Option<Option<String>>,
    /// Absent leaves the manager alone; `null` clears it.
    #[serde(default, deserialize_with = "validation::present")]
    pub project_manager: Option<Option<Uuid>>,
    pub outreach: Option<Vec<Uuid>>,
    pub designers: Option<Vec<Uuid>>,
    pub developers: Option<Vec<Uuid>>,
}

pub fn router(state: &AppState) -> Router<AppState> {
    let members = gated(
        Router::new()
            .route("/api/projects", get(list_projects))
            .route("/api/projects/mine", get(my_projects)),
        state,
        &[],
    );
    let admin = gated(
        Router::new()
            .route("/api/projects", post(create_project))
            .route("/api/projects/{id}", put(edit_project).delete(delete_project)),
        state,
        &[Capability::Admin],
    );
    members.merge(admin)
}

async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<Project>>, ApiError> {
    Ok(Json(projects::get_all_projects(&state.pool).await?))
}

async fn my_projects(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<Project>>, ApiError> {
    Ok(Json(
        projects::get_user_projects(&state.pool, auth.user_id()).await?,
    ))
}

#[tracing::instrument(skip(state, auth, body), fields(name = %body.name), err)]
async fn create_project(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(body): ValidJson<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    validation::check_name("name", &body.name)?;
    if let Some(ref description) = body.description {
        validation::check_length("description", description, 0, 10_000)?;
    }

    let project = projects::create_project(
        &state.pool,
        NewProject {
            name: body.name,
            description: body.description,
            project_manager: body.project_manager,
            outreach: body.outreach,
            designers: body.designers,
            developers: body.developers,
        },
    )
    .await?;

    write_audit(
        &state.pool,
        &auth,
        &AuditEntry {
            action: "project.create",
            resource: "project",
            resource_id: Some(project.id),
            detail: Some(serde_json::json!({ "name": project.name })),
        },
    )
    .await;

    Ok((StatusCode::CREATED, Json(project)))
}

#[tracing::instrument(skip(state, auth, body), err)]
async fn edit_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    ValidJson(body): ValidJson<EditProjectRequest>,
) -> Result<Json<Project>, ApiError> {
    if let Some(ref name) = body.name {
        validation::check_name("name", name)?;
    }
    if let Some(Some(ref description)) = body.description {
        validation::check_length("description", description, 0, 10_000)?;
    }

    let project = projects::edit_project(
        &state.pool,
        id,
        ProjectEdit {
            name: body.name,
            description: body.description,
            project_manager: body.project_manager,
            outreach: body.outreach,
            designers: body.designers,
            developers: body.developers,
        },
    )
    .await?;

    write_audit(
        &state.pool,
        &auth,
        &AuditEntry {
            action: "project.update",
            resource: "project",
            resource_id: Some(id),
            detail: None,
        },
    )
    .await;

    Ok(Json(project))
}

#[tracing::instrument(skip(state, auth), err)]
async fn delete_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    projects::delete_project(&state.pool, id).await?;

    write_audit(
        &state.pool,
        &auth,
        &AuditEntry {
            action: "project.delete",
            resource: "project",
            resource_id: Some(id),
            detail: None,
        },
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
