use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::{AuthUser, ClientIp};
use crate::auth::rate_limit::{
    LOGIN_MAX_ATTEMPTS, LOGIN_WINDOW_SECS, check_rate, clear_rate, login_identifier,
};
use crate::auth::{password, reset};
use crate::config::Config;
use crate::error::ApiError;
use crate::model::{NewUser, UserResponse};
use crate::notify::email;
use crate::service::users;
use crate::store::AppState;
use crate::validation::{self, ValidJson};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub secret: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
    pub secret: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct Empty {}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .route("/api/auth/forgot-password", post(forgot_password))
        .route("/api/auth/reset-password", post(reset_password))
        .route("/api/auth/change-password", post(change_password))
}

/// Registration and reset requests must present the shared secret. An
/// unset secret turns both flows off.
fn require_shared_secret(config: &Config, presented: &str) -> Result<(), ApiError> {
    match config.registration_secret.as_deref() {
        Some(secret) if secret == presented => Ok(()),
        Some(_) => Err(ApiError::Forbidden),
        None => {
            tracing::debug!("registration secret not configured, refusing request");
            Err(ApiError::Forbidden)
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[tracing::instrument(skip(state, body), fields(email = %body.email), err)]
async fn register(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    validation::check_name("name", &body.name)?;
    let email = validation::check_email(&body.email)?;
    validation::check_password(&body.password)?;
    validation::check_secret(&body.secret)?;
    require_shared_secret(&state.config, &body.secret)?;

    let new_user = NewUser::new(&body.name, &email, &body.password, true)?;
    let user = users::create_user(&state.pool, new_user).await?;
    let token = state.jwt.issue(&user)?;

    tracing::info!(user_id = %user.id, "user registered");
    Ok(Json(AuthResponse { user, token }))
}

#[tracing::instrument(skip(state, body), fields(email = %body.email), err)]
async fn login(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    ValidJson(body): ValidJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = body.email.trim().to_lowercase();
    let limiter_key = login_identifier(&email, client_ip.as_deref());
    check_rate(
        &state.valkey,
        "login",
        &limiter_key,
        LOGIN_MAX_ATTEMPTS,
        LOGIN_WINDOW_SECS,
    )
    .await?;

    let creds = users::find_credentials_by_email(&state.pool, &email).await?;

    // Timing-safe: always run argon2 verify even when the user is unknown
    let hash_to_verify = creds
        .as_ref()
        .map_or_else(|| password::dummy_hash().to_owned(), |c| c.password_hash.clone());
    let password_valid = password::verify_password(&body.password, &hash_to_verify)?;

    let user_id = match creds {
        Some(c) if password_valid && c.active => c.id,
        _ => return Err(ApiError::Unauthorized),
    };

    let user = users::find_by_id(&state.pool, user_id)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    let token = state.jwt.issue(&user)?;

    clear_rate(&state.valkey, "login", &limiter_key).await?;
    Ok(Json(AuthResponse { user, token }))
}

async fn me(auth: AuthUser) -> Json<MeResponse> {
    Json(MeResponse { user: auth.user })
}

/// Always answers 200 once the secret checks out, whether or not the email
/// belongs to an account.
#[tracing::instrument(skip(state, body), fields(email = %body.email), err)]
async fn forgot_password(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<ForgotPasswordRequest>,
) -> Result<Json<Empty>, ApiError> {
    let email = validation::check_email(&body.email)?;
    validation::check_secret(&body.secret)?;
    require_shared_secret(&state.config, &body.secret)?;

    let Some(user) = users::find_by_email(&state.pool, &email).await? else {
        tracing::debug!("password reset requested for unknown email");
        return Ok(Json(Empty {}));
    };
    if !user.active {
        tracing::debug!(user_id = %user.id, "password reset requested for inactive user");
        return Ok(Json(Empty {}));
    }

    let token = reset::issue(&state.valkey, user.id, state.config.reset_token_ttl_secs).await?;
    if let Err(e) = email::send_password_reset(&state.config, &user.email, token).await {
        tracing::warn!(error = %e, user_id = %user.id, "failed to send password reset email");
    }
    Ok(Json(Empty {}))
}

#[tracing::instrument(skip(state, body), err)]
async fn reset_password(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<ResetPasswordRequest>,
) -> Result<Json<Empty>, ApiError> {
    let token = validation::check_uuid_v4("token", &body.token)?;
    validation::check_password(&body.password)?;

    let user_id = reset::consume(&state.valkey, token)
        .await?
        .ok_or_else(|| ApiError::NotFound("Reset token is invalid or has expired".into()))?;

    let hash = password::hash_password(&body.password)?;
    users::set_password(&state.pool, user_id, &hash).await?;

    tracing::info!(%user_id, "password reset");
    Ok(Json(Empty {}))
}

#[tracing::instrument(skip(state, auth, body), fields(user_id = %auth.user_id()), err)]
async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(body): ValidJson<ChangePasswordRequest>,
) -> Result<Json<Empty>, ApiError> {
    validation::check_password(&body.password)?;

    let hash = password::hash_password(&body.password)?;
    users::set_password(&state.pool, auth.user_id(), &hash).await?;
    Ok(Json(Empty {}))
}
