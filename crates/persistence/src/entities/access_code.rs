//! Access code entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{CodeStatus, Role};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the access_codes table.
#[derive(Debug, Clone, FromRow)]
pub struct AccessCodeEntity {
    pub id: Uuid,
    pub role: Role,
    pub code: String,
    pub status: CodeStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub used_by: Option<String>,
}

impl From<AccessCodeEntity> for domain::models::AccessCode {
    fn from(entity: AccessCodeEntity) -> Self {
        Self {
            id: entity.id,
            role: entity.role,
            code: entity.code,
            status: entity.status,
            created_by: entity.created_by,
            created_at: entity.created_at,
            expires_at: entity.expires_at,
            used_at: entity.used_at,
            used_by: entity.used_by,
        }
    }
}
