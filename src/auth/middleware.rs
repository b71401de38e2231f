use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::ApiError;
use crate::model::{Role, UserResponse};
use crate::service::users;
use crate::store::AppState;

/// Authenticated user extracted from the bearer token.
///
/// The token only proves identity; the user and role are re-read from the
/// database so deactivation and role changes apply to tokens already issued.
/// Once resolved, the capability gate stores it in the request extensions and
/// later extractions reuse that copy.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: UserResponse,
    pub ip_addr: Option<String>,
}

impl AuthUser {
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    pub fn role(&self) -> Option<&Role> {
        self.user.role.as_ref()
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(resolved) = parts.extensions.get::<Self>() {
            return Ok(resolved.clone());
        }

        let raw_token = extract_bearer_token(parts).ok_or(ApiError::Unauthorized)?;
        let claims = state.jwt.verify(&raw_token).map_err(|e| {
            tracing::debug!(error = %e, "bearer token rejected");
            ApiError::Unauthorized
        })?;

        let user = users::find_by_id(&state.pool, claims.sub)
            .await?
            .ok_or(ApiError::Unauthorized)?;
        if !user.active {
            return Err(ApiError::Unauthorized);
        }

        Ok(Self {
            user,
            ip_addr: extract_ip(parts, state.config.trust_proxy_headers),
        })
    }
}

/// Client address of the request, honouring `X-Forwarded-For` only when
/// proxy headers are trusted. Never rejects.
#[derive(Debug, Clone)]
pub struct ClientIp(pub Option<String>);

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(extract_ip(parts, state.config.trust_proxy_headers)))
    }
}

fn extract_bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?;
    if token.is_empty() {
        return None;
    }
    Some(token.to_owned())
}

fn extract_ip(parts: &Parts, trust_proxy: bool) -> Option<String> {
    // Only trust X-Forwarded-For when behind a configured reverse proxy
    if trust_proxy
        && let Some(forwarded) = parts.headers.get("x-forwarded-for")
        && let Ok(val) = forwarded.to_str()
        && let Some(first_ip) = val.split(',').next()
    {
        return Some(first_ip.trim().to_owned());
    }
    parts
        .extensions
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
}
