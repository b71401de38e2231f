pub mod applications;
pub mod auth;
pub mod projects;
pub mod roles;
pub mod stats;
pub mod users;

use axum::Router;

use crate::store::AppState;

/// All `/api` routes. Capability gates are attached per route group, so the
/// state is needed while building.
pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(roles::router(state))
        .merge(users::router(state))
        .merge(projects::router(state))
        .merge(stats::router(state))
        .merge(applications::router(state))
}
