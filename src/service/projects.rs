use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::model::Project;

const PROJECT_COLUMNS: &str =
    "id, name, description, project_manager, outreach, designers, developers, created_at";

#[derive(Debug, Default)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub project_manager: Option<Uuid>,
    pub outreach: Vec<Uuid>,
    pub designers: Vec<Uuid>,
    pub developers: Vec<Uuid>,
}

/// Partial update; absent fields keep their stored value. The nullable
/// columns take `Some(None)` to clear them.
#[derive(Debug, Default)]
pub struct ProjectEdit {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub project_manager: Option<Option<Uuid>>,
    pub outreach: Option<Vec<Uuid>>,
    pub designers: Option<Vec<Uuid>>,
    pub developers: Option<Vec<Uuid>>,
}

fn project_missing() -> ApiError {
    ApiError::NotFound("Project does not exist".into())
}

pub async fn get_all_projects(pool: &PgPool) -> Result<Vec<Project>, ApiError> {
    let projects = sqlx::query_as(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at"
    ))
    .fetch_all(pool)
    .await?;
    Ok(projects)
}

/// Projects the user manages or contributes to in any capacity.
pub async fn get_user_projects(pool: &PgPool, user_id: Uuid) -> Result<Vec<Project>, ApiError> {
    let projects = sqlx::query_as(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects
         WHERE project_manager = $1
            OR $1 = ANY(outreach)
            OR $1 = ANY(designers)
            OR $1 = ANY(developers)
         ORDER BY created_at"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(projects)
}

#[tracing::instrument(skip(pool), err)]
pub async fn create_project(pool: &PgPool, project: NewProject) -> Result<Project, ApiError> {
    let created = sqlx::query_as(&format!(
        "INSERT INTO projects (name, description, project_manager, outreach, designers, developers)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {PROJECT_COLUMNS}"
    ))
    .bind(project.name.trim())
    .bind(&project.description)
    .bind(project.project_manager)
    .bind(&project.outreach)
    .bind(&project.designers)
    .bind(&project.developers)
    .fetch_one(pool)
    .await?;
    Ok(created)
}

#[tracing::instrument(skip(pool), err)]
pub async fn edit_project(pool: &PgPool, id: Uuid, edit: ProjectEdit) -> Result<Project, ApiError> {
    let updated: Option<Project> = sqlx::query_as(&format!(
        "UPDATE projects SET
            name = COALESCE($2, name),
            description = CASE WHEN $3 THEN $4 ELSE description END,
            project_manager = CASE WHEN $5 THEN $6 ELSE project_manager END,
            outreach = COALESCE($7, outreach),
            designers = COALESCE($8, designers),
            developers = COALESCE($9, developers)
         WHERE id = $1
         RETURNING {PROJECT_COLUMNS}"
    ))
    .bind(id)
    .bind(edit.name.as_deref().map(str::trim))
    .bind(edit.description.is_some())
    .bind(edit.description.flatten())
    .bind(edit.project_manager.is_some())
    .bind(edit.project_manager.flatten())
    .bind(&edit.outreach)
    .bind(&edit.designers)
    .bind(&edit.developers)
    .fetch_optional(pool)
    .await?;

    updated.ok_or_else(project_missing)
}

#[tracing::instrument(skip(pool), err)]
pub async fn delete_project(pool: &PgPool, id: Uuid) -> Result<(), ApiError> {
    let result = sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(project_missing());
    }
    Ok(())
}
