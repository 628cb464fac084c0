//! Bearer-token authentication middleware.
//!
//! Validates the JWT in the `Authorization` header and stores the caller's
//! identity in request extensions for downstream handlers.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use domain::models::Role;
use serde_json::json;
use shared::jwt::JwtKeys;
use uuid::Uuid;

use crate::app::AppState;

/// Authenticated caller identity extracted from a session token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub name: String,
    /// Token identifier (jti), kept for log correlation.
    pub jti: String,
}

impl AuthUser {
    /// Validates a session token and returns the caller identity.
    pub fn validate(jwt: &JwtKeys, token: &str) -> Result<Self, String> {
        let claims = jwt
            .validate_token(token)
            .map_err(|e| format!("Invalid token: {}", e))?;

        let user_id =
            Uuid::parse_str(&claims.sub).map_err(|_| "Invalid user ID in token".to_string())?;
        let role: Role = claims
            .role
            .parse()
            .map_err(|_| "Invalid role in token".to_string())?;

        Ok(AuthUser {
            user_id,
            email: claims.email,
            role,
            name: claims.name,
            jti: claims.jti,
        })
    }
}

/// Middleware that requires a valid bearer token.
///
/// Rejects requests without a valid JWT; on success the `AuthUser` is
/// inserted into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => {
            return unauthorized_response("Missing or invalid Authorization header");
        }
    };

    match AuthUser::validate(&state.jwt, token) {
        Ok(auth) => {
            req.extensions_mut().insert(auth);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!("Token validation failed: {}", e);
            unauthorized_response("Invalid or expired token")
        }
    }
}

/// Helper to create an unauthorized response in the uniform error envelope.
pub(crate) fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "success": false,
            "error": "unauthorized",
            "message": message
        })),
    )
        .into_response()
}
