use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::Router;

use crate::auth::middleware::AuthUser;
use crate::error::ApiError;
use crate::rbac::types::{Capability, is_authorized};
use crate::store::AppState;

/// Create a middleware that admits only authenticated, active users whose
/// role grants every capability in `required`. An empty slice admits any
/// authenticated user.
///
/// On success the resolved [`AuthUser`] is placed in the request extensions,
/// where handlers pick it up through the usual extractor.
///
/// Usage:
/// ```ignore
/// Router::new()
///     .route("/api/roles", get(list_roles))
///     .route_layer(axum::middleware::from_fn_with_state(
///         state.clone(),
///         require_capabilities(&[Capability::Admin]),
///     ))
/// ```
#[allow(clippy::type_complexity)]
pub fn require_capabilities(
    required: &'static [Capability],
) -> impl Fn(
    AuthUser,
    Request,
    Next,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, ApiError>> + Send>>
+ Clone
+ Send {
    move |auth: AuthUser, mut req: Request, next: Next| {
        Box::pin(async move {
            if !is_authorized(required, auth.role()) {
                tracing::warn!(
                    user_id = %auth.user_id(),
                    required = ?required,
                    "capability check failed"
                );
                return Err(ApiError::Forbidden);
            }

            req.extensions_mut().insert(auth);
            Ok(next.run(req).await)
        })
    }
}

/// Wrap every route of `router` in a capability gate.
pub fn gated(
    router: Router<AppState>,
    state: &AppState,
    required: &'static [Capability],
) -> Router<AppState> {
    router.route_layer(middleware::from_fn_with_state(
        state.clone(),
        require_capabilities(required),
    ))
}
