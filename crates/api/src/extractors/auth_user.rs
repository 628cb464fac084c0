//! Authenticated-user extractor.
//!
//! Reuses the identity inserted by the auth middleware when present, and
//! falls back to validating the `Authorization` header itself so handlers
//! can use it on routes without the middleware layer.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::auth::AuthUser as AuthUserData;

/// Authenticated caller identity, available as a handler argument.
pub type AuthUser = AuthUserData;

#[async_trait]
impl FromRequestParts<AppState> for AuthUserData {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(auth) = parts.extensions.get::<AuthUserData>() {
            return Ok(auth.clone());
        }

        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization header format".to_string()))?;

        AuthUserData::validate(&state.jwt, token)
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))
    }
}
