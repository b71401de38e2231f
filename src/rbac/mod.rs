pub mod middleware;
pub mod types;

pub use middleware::{gated, require_capabilities};
pub use types::{Capability, is_authorized};
