use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::audit::{AuditEntry, write_audit};
use crate::auth::middleware::AuthUser;
use crate::error::ApiError;
use crate::model::{ApplicationResponse, PipelineResponse, Stage};
use crate::rbac::{Capability, gated};
use crate::service::applications::{self, ApplicationFilter, NewApplication};
use crate::store::AppState;
use crate::validation::{self, ValidJson};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SetPipelineRequest {
    pub role_id: Uuid,
    pub stages: Vec<Stage>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitApplicationRequest {
    pub role_id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub role_id: Option<Uuid>,
    pub completed: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct MoveStageRequest {
    pub stage: Stage,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub accepted: bool,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: &AppState) -> Router<AppState> {
    let public = Router::new().route("/api/applications", post(submit_application));

    let reviewers = gated(
        Router::new()
            .route("/api/pipelines", get(list_pipelines))
            .route("/api/applications", get(list_applications))
            .route("/api/applications/{id}", get(get_application))
            .route("/api/applications/{id}/stage", post(move_stage)),
        state,
        &[Capability::RegularReview],
    );

    let final_reviewers = gated(
        Router::new().route("/api/applications/{id}/decision", post(decide)),
        state,
        &[Capability::FinalReview],
    );

    let admin = gated(
        Router::new().route("/api/pipelines", axum::routing::put(set_pipeline)),
        state,
        &[Capability::Admin],
    );

    public.merge(reviewers).merge(final_reviewers).merge(admin)
}

// ---------------------------------------------------------------------------
// Pipelines
// ---------------------------------------------------------------------------

async fn list_pipelines(
    State(state): State<AppState>,
) -> Result<Json<Vec<PipelineResponse>>, ApiError> {
    Ok(Json(applications::list_pipelines(&state.pool).await?))
}

#[tracing::instrument(skip(state, auth, body), fields(role_id = %body.role_id), err)]
async fn set_pipeline(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(body): ValidJson<SetPipelineRequest>,
) -> Result<Json<PipelineResponse>, ApiError> {
    let pipeline = applications::set_pipeline(&state.pool, body.role_id, &body.stages).await?;

    write_audit(
        &state.pool,
        &auth,
        &AuditEntry {
            action: "pipeline.set",
            resource: "pipeline",
            resource_id: Some(pipeline.id),
            detail: Some(serde_json::json!({
                "role_id": pipeline.role_id,
                "stages": pipeline.stages,
            })),
        },
    )
    .await;

    Ok(Json(pipeline))
}

// ---------------------------------------------------------------------------
// Applications
// ---------------------------------------------------------------------------

#[tracing::instrument(skip(state, body), fields(role_id = %body.role_id), err)]
async fn submit_application(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<SubmitApplicationRequest>,
) -> Result<(StatusCode, Json<ApplicationResponse>), ApiError> {
    validation::check_name("name", &body.name)?;
    let email = validation::check_email(&body.email)?;

    let application = applications::create_application(
        &state.pool,
        NewApplication {
            role_id: body.role_id,
            name: body.name,
            email,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(application)))
}

async fn list_applications(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<ApplicationResponse>>, ApiError> {
    let filter = ApplicationFilter {
        role_id: params.role_id,
        completed: params.completed,
    };
    Ok(Json(
        applications::list_applications(&state.pool, &filter).await?,
    ))
}

async fn get_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApplicationResponse>, ApiError> {
    Ok(Json(applications::get_application(&state.pool, id).await?))
}

#[tracing::instrument(skip(state, auth, body), fields(user_id = %auth.user_id()), err)]
async fn move_stage(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    ValidJson(body): ValidJson<MoveStageRequest>,
) -> Result<Json<ApplicationResponse>, ApiError> {
    Ok(Json(
        applications::move_stage(&state.pool, id, body.stage).await?,
    ))
}

#[tracing::instrument(skip(state, auth, body), err)]
async fn decide(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    ValidJson(body): ValidJson<DecisionRequest>,
) -> Result<Json<ApplicationResponse>, ApiError> {
    let application = applications::decide(&state.pool, id, body.accepted).await?;

    write_audit(
        &state.pool,
        &auth,
        &AuditEntry {
            action: "application.decide",
            resource: "application",
            resource_id: Some(id),
            detail: Some(serde_json::json!({ "accepted": body.accepted })),
        },
    )
    .await;

    Ok(Json(application))
}
