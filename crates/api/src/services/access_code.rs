//! Access code service: issuance, listing, and retirement of role-scoped
//! registration codes. All operations here are manager-only at the HTTP
//! layer; consumption during registration lives in the auth service.

use domain::models::{code_expiry, generate_code, normalize_code, AccessCode, Role};
use persistence::repositories::AccessCodeRepository;
use sqlx::PgPool;
use thiserror::Error;

use crate::middleware::metrics::record_access_code_issued;

/// Errors that can occur during access code administration.
#[derive(Debug, Error)]
pub enum AccessCodeError {
    #[error("Role must be one of: field_officer, finance, manager")]
    InvalidRole,

    #[error("Code not found or already expired")]
    CodeNotActive,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Access code administration service.
pub struct AccessCodeService {
    codes: AccessCodeRepository,
}

impl AccessCodeService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            codes: AccessCodeRepository::new(pool),
        }
    }

    /// Generate a fresh code for the role, superseding any active ones.
    pub async fn generate(
        &self,
        role: &str,
        created_by: &str,
    ) -> Result<AccessCode, AccessCodeError> {
        let role = Self::parse_code_role(role)?;

        let code = self
            .codes
            .rotate(role, &generate_code(), created_by, code_expiry())
            .await?;

        record_access_code_issued(role.as_str(), "manager");
        tracing::info!(role = %role, created_by = %created_by, "Access code generated");

        Ok(code)
    }

    /// Newest active code per role.
    pub async fn list_active(&self) -> Result<Vec<AccessCode>, AccessCodeError> {
        Ok(self.codes.list_active().await?)
    }

    /// Most recent codes across all roles and statuses.
    pub async fn history(&self) -> Result<Vec<AccessCode>, AccessCodeError> {
        Ok(self.codes.history().await?)
    }

    /// Manually expire an active code. Whether the code was used, already
    /// expired, or never existed is indistinguishable to the caller.
    pub async fn expire(&self, raw_code: &str) -> Result<(), AccessCodeError> {
        let code = normalize_code(raw_code);

        if self.codes.expire_code(&code).await? {
            tracing::info!(code = %code, "Access code manually expired");
            Ok(())
        } else {
            Err(AccessCodeError::CodeNotActive)
        }
    }

    /// Codes are only minted for roles that register through them. Farmer
    /// accounts have no code lane at all.
    fn parse_code_role(role: &str) -> Result<Role, AccessCodeError> {
        match role.parse::<Role>() {
            Ok(Role::Farmer) | Err(_) => Err(AccessCodeError::InvalidRole),
            Ok(role) => Ok(role),
        }
    }
}
