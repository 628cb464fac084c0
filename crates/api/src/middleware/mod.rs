//! HTTP middleware: logging, tracing, metrics, security headers,
//! authentication, and role-based authorization.

pub mod auth;
pub mod logging;
pub mod metrics;
pub mod rbac;
pub mod security_headers;
pub mod trace_id;

pub use auth::{require_auth, AuthUser};
pub use metrics::{init_metrics, metrics_handler, metrics_middleware};
pub use rbac::require_manager;
pub use security_headers::security_headers_middleware;
pub use trace_id::trace_id;
