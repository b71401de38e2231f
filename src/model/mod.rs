pub mod application;
pub mod project;
pub mod role;
pub mod user;

pub use application::{ApplicationResponse, PipelineResponse, Stage};
pub use project::Project;
pub use role::Role;
pub use user::{NewUser, UserResponse};
