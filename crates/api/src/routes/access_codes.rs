//! Access code administration routes. All of these sit behind the manager
//! guard in the router.

use axum::{extract::State, http::StatusCode, Json};
use domain::models::{
    AccessCodeResponse, ActiveCodeResponse, ExpireCodeRequest, GenerateCodeRequest,
};
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::routes::auth::MessageResponse;
use crate::services::access_code::{AccessCodeError, AccessCodeService};

/// Generate a fresh access code for a role, superseding any active one.
///
/// POST /api/access-codes/generate
pub async fn generate(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<GenerateCodeRequest>,
) -> Result<(StatusCode, Json<AccessCodeResponse>), ApiError> {
    request.validate()?;

    let service = AccessCodeService::new(state.pool.clone());
    let code = service
        .generate(&request.role, &auth.email)
        .await
        .map_err(map_code_error)?;

    Ok((StatusCode::CREATED, Json(code.into())))
}

/// List the newest active code for each role.
///
/// GET /api/access-codes/active
pub async fn list_active(
    State(state): State<AppState>,
) -> Result<Json<Vec<ActiveCodeResponse>>, ApiError> {
    let service = AccessCodeService::new(state.pool.clone());
    let codes = service.list_active().await.map_err(map_code_error)?;

    Ok(Json(codes.into_iter().map(Into::into).collect()))
}

/// List the most recent codes across all roles and statuses.
///
/// GET /api/access-codes/history
pub async fn history(
    State(state): State<AppState>,
) -> Result<Json<Vec<AccessCodeResponse>>, ApiError> {
    let service = AccessCodeService::new(state.pool.clone());
    let codes = service.history().await.map_err(map_code_error)?;

    Ok(Json(codes.into_iter().map(Into::into).collect()))
}

/// Manually expire an active code.
///
/// POST /api/access-codes/expire
pub async fn expire(
    State(state): State<AppState>,
    Json(request): Json<ExpireCodeRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    request.validate()?;

    let service = AccessCodeService::new(state.pool.clone());
    service.expire(&request.code).await.map_err(map_code_error)?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Access code expired".to_string(),
    }))
}

fn map_code_error(e: AccessCodeError) -> ApiError {
    match e {
        AccessCodeError::InvalidRole | AccessCodeError::CodeNotActive => {
            ApiError::Validation(e.to_string())
        }
        AccessCodeError::DatabaseError(db_err) => ApiError::from(db_err),
    }
}
