use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::ApiError;
use crate::model::Stage;
use crate::model::application::{ACCEPTED, REJECTED};

/// `{ role name -> { stage name | "Accepted" | "Rejected" -> count } }`
pub type ApplicationStats = BTreeMap<String, BTreeMap<String, i64>>;

/// One grouped count: applications of `role_name` sharing a stage and outcome.
#[derive(Debug, sqlx::FromRow)]
pub struct StatsBucket {
    pub role_name: String,
    pub current_stage: Option<String>,
    pub completed: bool,
    pub accepted: bool,
    pub count: i64,
}

/// Count applications created in `[start, end]` per role with a pipeline.
#[tracing::instrument(skip(pool), err)]
pub async fn get_application_stats(
    pool: &PgPool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<ApplicationStats, ApiError> {
    let roles: Vec<String> = sqlx::query_scalar(
        "SELECT r.name FROM application_pipelines p JOIN roles r ON r.id = p.role_id",
    )
    .fetch_all(pool)
    .await?;

    let buckets: Vec<StatsBucket> = sqlx::query_as(
        "SELECT r.name AS role_name, a.current_stage, a.completed, a.accepted,
                COUNT(*) AS count
         FROM applications a
         JOIN application_pipelines p ON p.role_id = a.role_id
         JOIN roles r ON r.id = a.role_id
         WHERE a.created_at BETWEEN $1 AND $2
         GROUP BY r.name, a.current_stage, a.completed, a.accepted",
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    Ok(tally(roles, buckets))
}

fn empty_counts() -> BTreeMap<String, i64> {
    Stage::ALL
        .iter()
        .map(|s| s.as_str())
        .chain([ACCEPTED, REJECTED])
        .map(|key| (key.to_owned(), 0))
        .collect()
}

/// Fold grouped counts into the stats map. Every role in `roles` gets every
/// key, zero-filled. Completed applications count only towards their outcome.
pub fn tally(
    roles: impl IntoIterator<Item = String>,
    buckets: impl IntoIterator<Item = StatsBucket>,
) -> ApplicationStats {
    let mut stats: ApplicationStats = roles
        .into_iter()
        .map(|role| (role, empty_counts()))
        .collect();

    for bucket in buckets {
        let key = match (bucket.completed, bucket.accepted) {
            (true, true) => ACCEPTED.to_owned(),
            (true, false) => REJECTED.to_owned(),
            (false, _) => match bucket.current_stage {
                Some(stage) => stage,
                None => continue,
            },
        };
        let counts = stats.entry(bucket.role_name).or_insert_with(empty_counts);
        *counts.entry(key).or_insert(0) += bucket.count;
    }

    stats
}
