pub mod audit;
pub mod config;
pub mod error;
pub mod store;
pub mod validation;

// Identity, auth & capability gates
pub mod api;
pub mod auth;
pub mod rbac;

// Domain
pub mod model;
pub mod service;

pub mod notify;
