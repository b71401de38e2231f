use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A position within the organization (e.g. Developer, VP Operations).
///
/// Users hold at most one role and applications target one. The three flags
/// are independent capabilities:
/// - `permit_regular_review`: take part in recruitment reviews.
/// - `permit_final_review`: make the final accept/reject decision.
/// - `permit_admin`: manage roles, users, projects, and pipelines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub permit_regular_review: bool,
    pub permit_final_review: bool,
    pub permit_admin: bool,
    pub created_at: DateTime<Utc>,
}
