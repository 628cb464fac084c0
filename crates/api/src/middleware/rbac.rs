//! Role-based access control middleware.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use domain::models::Role;
use serde_json::json;

use crate::middleware::auth::{unauthorized_response, AuthUser};

/// Middleware that requires the authenticated caller to be a manager.
///
/// Requires `AuthUser` in request extensions, so it must be layered inside
/// `require_auth`.
pub async fn require_manager(req: Request<Body>, next: Next) -> Response {
    let auth = match req.extensions().get::<AuthUser>() {
        Some(auth) => auth,
        None => {
            tracing::warn!("RBAC middleware called without AuthUser in extensions");
            return unauthorized_response("Authentication required");
        }
    };

    if auth.role != Role::Manager {
        tracing::debug!(
            user_id = %auth.user_id,
            role = %auth.role,
            "Manager-only route denied"
        );
        return forbidden_response("Manager role required");
    }

    next.run(req).await
}

fn forbidden_response(message: &str) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "success": false,
            "error": "forbidden",
            "message": message
        })),
    )
        .into_response()
}
