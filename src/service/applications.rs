use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::model::application::{ApplicationRow, PipelineRow};
use crate::model::{ApplicationResponse, PipelineResponse, Stage};

const APPLICATION_COLUMNS: &str =
    "id, role_id, name, email, current_stage, completed, accepted, created_at";

#[derive(Debug)]
pub struct NewApplication {
    pub role_id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Default)]
pub struct ApplicationFilter {
    pub role_id: Option<Uuid>,
    pub completed: Option<bool>,
}

fn application_missing() -> ApiError {
    ApiError::NotFound("Application does not exist".into())
}

fn to_response(row: ApplicationRow) -> Result<ApplicationResponse, ApiError> {
    ApplicationResponse::try_from(row).map_err(ApiError::Internal)
}

async fn pipeline_stages<'e, E>(executor: E, role_id: Uuid) -> Result<Option<Vec<Stage>>, ApiError>
where
    E: sqlx::PgExecutor<'e>,
{
    let stages: Option<Vec<String>> =
        sqlx::query_scalar("SELECT stages FROM application_pipelines WHERE role_id = $1")
            .bind(role_id)
            .fetch_optional(executor)
            .await?;
    stages
        .map(|stages| {
            stages
                .iter()
                .map(|s| s.parse::<Stage>())
                .collect::<anyhow::Result<Vec<_>>>()
                .map_err(ApiError::Internal)
        })
        .transpose()
}

// ---------------------------------------------------------------------------
// Pipelines
// ---------------------------------------------------------------------------

pub async fn list_pipelines(pool: &PgPool) -> Result<Vec<PipelineResponse>, ApiError> {
    let rows: Vec<PipelineRow> = sqlx::query_as(
        "SELECT p.id, p.role_id, r.name AS role_name, p.stages, p.created_at
         FROM application_pipelines p
         JOIN roles r ON r.id = p.role_id
         ORDER BY r.name",
    )
    .fetch_all(pool)
    .await?;
    rows.into_iter()
        .map(|row| PipelineResponse::try_from(row).map_err(ApiError::Internal))
        .collect()
}

/// Create or replace the pipeline of `role_id`. Stages are stored in the
/// order given.
#[tracing::instrument(skip(pool), err)]
pub async fn set_pipeline(
    pool: &PgPool,
    role_id: Uuid,
    stages: &[Stage],
) -> Result<PipelineResponse, ApiError> {
    let stages = Stage::normalize_pipeline(stages).map_err(ApiError::BadRequest)?;
    let names: Vec<&str> = stages.iter().map(|s| s.as_str()).collect();

    let role_name: Option<String> = sqlx::query_scalar("SELECT name FROM roles WHERE id = $1")
        .bind(role_id)
        .fetch_optional(pool)
        .await?;
    let Some(role_name) = role_name else {
        return Err(ApiError::NotFound("Role does not exist".into()));
    };

    let (id, created_at): (Uuid, chrono::DateTime<chrono::Utc>) = sqlx::query_as(
        "INSERT INTO application_pipelines (role_id, stages)
         VALUES ($1, $2)
         ON CONFLICT (role_id) DO UPDATE SET stages = EXCLUDED.stages
         RETURNING id, created_at",
    )
    .bind(role_id)
    .bind(&names)
    .fetch_one(pool)
    .await?;

    Ok(PipelineResponse {
        id,
        role_id,
        role_name,
        stages,
        created_at,
    })
}

// ---------------------------------------------------------------------------
// Applications
// ---------------------------------------------------------------------------

/// Submit an application. It starts at the first stage of the role's pipeline.
#[tracing::instrument(skip(pool), err)]
pub async fn create_application(
    pool: &PgPool,
    application: NewApplication,
) -> Result<ApplicationResponse, ApiError> {
    let first = pipeline_stages(pool, application.role_id)
        .await?
        .and_then(|stages| stages.first().copied())
        .ok_or_else(|| ApiError::NotFound("Role is not accepting applications".into()))?;

    let row: ApplicationRow = sqlx::query_as(&format!(
        "INSERT INTO applications (role_id, name, email, current_stage)
         VALUES ($1, $2, $3, $4)
         RETURNING {APPLICATION_COLUMNS}"
    ))
    .bind(application.role_id)
    .bind(application.name.trim())
    .bind(&application.email)
    .bind(first.as_str())
    .fetch_one(pool)
    .await?;

    to_response(row)
}

pub async fn list_applications(
    pool: &PgPool,
    filter: &ApplicationFilter,
) -> Result<Vec<ApplicationResponse>, ApiError> {
    let rows: Vec<ApplicationRow> = sqlx::query_as(&format!(
        "SELECT {APPLICATION_COLUMNS} FROM applications
         WHERE ($1::uuid IS NULL OR role_id = $1)
           AND ($2::boolean IS NULL OR completed = $2)
         ORDER BY created_at"
    ))
    .bind(filter.role_id)
    .bind(filter.completed)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(to_response).collect()
}

pub async fn get_application(pool: &PgPool, id: Uuid) -> Result<ApplicationResponse, ApiError> {
    let row: Option<ApplicationRow> = sqlx::query_as(&format!(
        "SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    to_response(row.ok_or_else(application_missing)?)
}

/// Move an open application to another stage of its role's pipeline.
#[tracing::instrument(skip(pool), err)]
pub async fn move_stage(
    pool: &PgPool,
    id: Uuid,
    stage: Stage,
) -> Result<ApplicationResponse, ApiError> {
    let mut tx = pool.begin().await?;

    let row: Option<ApplicationRow> = sqlx::query_as(&format!(
        "SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;
    let row = row.ok_or_else(application_missing)?;
    if row.completed {
        return Err(ApiError::Conflict("Application is already completed".into()));
    }

    let stages = pipeline_stages(&mut *tx, row.role_id)
        .await?
        .unwrap_or_default();
    if !stages.contains(&stage) {
        return Err(ApiError::BadRequest(format!(
            "'{stage}' is not a stage of this role's pipeline"
        )));
    }

    let row: ApplicationRow = sqlx::query_as(&format!(
        "UPDATE applications SET current_stage = $2 WHERE id = $1
         RETURNING {APPLICATION_COLUMNS}"
    ))
    .bind(id)
    .bind(stage.as_str())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    to_response(row)
}

/// Complete an application with the final accept/reject decision.
#[tracing::instrument(skip(pool), err)]
pub async fn decide(pool: &PgPool, id: Uuid, accepted: bool) -> Result<ApplicationResponse, ApiError> {
    let row: Option<ApplicationRow> = sqlx::query_as(&format!(
        "UPDATE applications SET completed = true, accepted = $2
         WHERE id = $1 AND NOT completed
         RETURNING {APPLICATION_COLUMNS}"
    ))
    .bind(id)
    .bind(accepted)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => to_response(row),
        None => {
            // Distinguish a missing application from one already decided
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM applications WHERE id = $1)")
                    .bind(id)
                    .fetch_one(pool)
                    .await?;
            if exists {
                Err(ApiError::Conflict("Application is already completed".into()))
            } else {
                Err(application_missing())
            }
        }
    }
}
