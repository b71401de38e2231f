use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::ApiError;
use crate::rbac::{Capability, gated};
use crate::service::stats::{self, ApplicationStats};
use crate::store::AppState;

#[derive(Debug, Deserialize)]
pub struct StatsParams {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

pub fn router(state: &AppState) -> Router<AppState> {
    gated(
        Router::new().route("/api/stats/applications", get(application_stats)),
        state,
        &[Capability::RegularReview],
    )
}

async fn application_stats(
    State(state): State<AppState>,
    params: Result<Query<StatsParams>, axum::extract::rejection::QueryRejection>,
) -> Result<Json<ApplicationStats>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if params.start > params.end {
        return Err(ApiError::BadRequest("start must not be after end".into()));
    }
    Ok(Json(
        stats::get_application_stats(&state.pool, params.start, params.end).await?,
    ))
}
