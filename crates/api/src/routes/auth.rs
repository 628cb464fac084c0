//! Authentication routes: login, registration, profile, password change.

use axum::{extract::State, http::StatusCode, Json};
use domain::models::UserResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::services::auth::{AuthError, AuthService};

/// Request body for login.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Response body for successful login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Request body for registration.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(min = 1, message = "Role is required"))]
    pub role: String,

    /// Access code (or the admin secret for manager registration)
    pub access_code: Option<String>,
}

/// Response body for successful registration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub token: String,
    pub user_id: Uuid,
}

/// Response body for the profile endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub user: UserResponse,
}

/// Request body for password change.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[validate(length(min = 8, message = "New password must be at least 8 characters"))]
    pub new_password: String,
}

/// Generic success envelope for mutations without a payload.
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// Login with email and password.
///
/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    request.validate()?;

    let service = auth_service(&state);
    let result = service
        .login(&request.email, &request.password)
        .await
        .map_err(map_auth_error)?;

    Ok(Json(LoginResponse {
        token: result.token,
        user: result.user.into(),
    }))
}

/// Register a new user with an access code.
///
/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    request.validate()?;

    let service = auth_service(&state);
    let result = service
        .register(
            &request.name,
            &request.email,
            &request.password,
            &request.role,
            request.access_code.as_deref(),
        )
        .await
        .map_err(map_auth_error)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            token: result.token,
            user_id: result.user.id,
        }),
    ))
}

/// Fetch the authenticated user's profile.
///
/// GET /api/auth/profile
pub async fn profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let service = auth_service(&state);
    let user = service.profile(auth.user_id).await.map_err(map_auth_error)?;

    Ok(Json(ProfileResponse { user: user.into() }))
}

/// Change the authenticated user's password.
///
/// POST /api/auth/change-password
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    request.validate()?;

    let service = auth_service(&state);
    service
        .change_password(auth.user_id, &request.current_password, &request.new_password)
        .await
        .map_err(map_auth_error)?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Password changed".to_string(),
    }))
}

fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(
        state.pool.clone(),
        state.jwt.clone(),
        state.config.provisioning.clone(),
    )
}

fn map_auth_error(e: AuthError) -> ApiError {
    match e {
        AuthError::InvalidCredentials
        | AuthError::InvalidAccessCode
        | AuthError::AccessCodeExpired
        | AuthError::InvalidCurrentPassword => ApiError::Unauthorized(e.to_string()),
        AuthError::FarmerSelfRegistration
        | AuthError::UnknownRole(_)
        | AuthError::AccessCodeRequired
        | AuthError::WeakPassword(_) => ApiError::Validation(e.to_string()),
        AuthError::EmailAlreadyExists => ApiError::Conflict(e.to_string()),
        AuthError::UserNotFound => ApiError::NotFound(e.to_string()),
        AuthError::DatabaseError(db_err) => ApiError::from(db_err),
        AuthError::PasswordError(e) => ApiError::Internal(format!("Password error: {}", e)),
        AuthError::TokenError(e) => ApiError::Internal(format!("Token error: {}", e)),
    }
}
