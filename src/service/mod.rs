//! Database-backed operations behind the HTTP handlers. Each function takes
//! the pool explicitly and returns `ApiError` so handlers can use `?`.

pub mod applications;
pub mod projects;
pub mod roles;
pub mod stats;
pub mod users;
