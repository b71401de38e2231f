use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::password;
use crate::model::Role;

/// Public representation of a user. Carries the populated role and never the
/// password hash; this is also the payload embedded in issued tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Option<Role>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// A user row joined with its (optional) role.
#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub role_id: Option<Uuid>,
    pub role_name: Option<String>,
    pub role_permit_regular_review: Option<bool>,
    pub role_permit_final_review: Option<bool>,
    pub role_permit_admin: Option<bool>,
    pub role_created_at: Option<DateTime<Utc>>,
}

impl From<UserRow> for UserResponse {
    fn from(row: UserRow) -> Self {
        let role = match (row.role_id, row.role_name, row.role_created_at) {
            (Some(id), Some(name), Some(created_at)) => Some(Role {
                id,
                name,
                permit_regular_review: row.role_permit_regular_review.unwrap_or(false),
                permit_final_review: row.role_permit_final_review.unwrap_or(false),
                permit_admin: row.role_permit_admin.unwrap_or(false),
                created_at,
            }),
            _ => None,
        };
        Self {
            id: row.id,
            email: row.email,
            name: row.name,
            role,
            active: row.active,
            created_at: row.created_at,
        }
    }
}

/// Fields needed to check a login attempt.
#[derive(Debug, sqlx::FromRow)]
pub struct UserCredentials {
    pub id: Uuid,
    pub password_hash: String,
    pub active: bool,
}

/// A user about to be inserted. The only way to build one is through
/// [`NewUser::new`], which hashes the plaintext password.
#[derive(Debug)]
pub struct NewUser {
    name: String,
    email: String,
    password_hash: String,
    active: bool,
}

impl NewUser {
    pub fn new(name: &str, email: &str, plain_password: &str, active: bool) -> anyhow::Result<Self> {
        Ok(Self {
            name: name.trim().to_owned(),
            email: email.to_owned(),
            password_hash: password::hash_password(plain_password)?,
            active,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn active(&self) -> bool {
        self.active
    }
}
