pub mod auth;
pub mod metrics;

pub use auth::{auth_middleware, AuthState, TenantContext};
pub use metrics::track_metrics;
