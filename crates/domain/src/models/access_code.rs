//! Access code domain model for role-gated self-registration.
//!
//! An access code grants one-time permission to register for a specific
//! privileged role. At most one active code exists per role; generating a
//! new one supersedes its predecessor, and a consumed code is immediately
//! replaced by a system-issued successor.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::user::Role;

/// Lifetime of a freshly issued access code.
pub const CODE_TTL_HOURS: i64 = 24;

/// Number of random bytes backing a code (hex-encoded, so code length is 2x).
const CODE_RANDOM_BYTES: usize = 4;

/// Maximum number of documents returned by the history listing.
pub const HISTORY_LIMIT: i64 = 50;

/// `created_by` marker for codes minted automatically after consumption.
pub const SYSTEM_AUTO_ISSUER: &str = "system_auto";

/// Lifecycle state of an access code.
///
/// `Used` and `Expired` are terminal; a code never returns to `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "access_code_status", rename_all = "snake_case")]
pub enum CodeStatus {
    Active,
    Used,
    Expired,
}

impl CodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeStatus::Active => "active",
            CodeStatus::Used => "used",
            CodeStatus::Expired => "expired",
        }
    }
}

impl std::str::FromStr for CodeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(CodeStatus::Active),
            "used" => Ok(CodeStatus::Used),
            "expired" => Ok(CodeStatus::Expired),
            other => Err(format!("Unknown code status: {other}")),
        }
    }
}

/// Access code domain model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AccessCode {
    pub id: Uuid,
    pub role: Role,
    pub code: String,
    pub status: CodeStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_by: Option<String>,
}

impl AccessCode {
    /// Whether the deadline has passed, regardless of stored status.
    pub fn is_past_deadline(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Seconds until expiry, clamped at zero.
    pub fn time_remaining_secs(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds().max(0)
    }
}

/// Generates a fresh code: 4 random bytes, hex-encoded, uppercase.
pub fn generate_code() -> String {
    let mut bytes = [0u8; CODE_RANDOM_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode_upper(bytes)
}

/// Normalizes a user-supplied code for lookup: trims surrounding whitespace
/// and uppercases, so pasted codes match regardless of case.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Expiry deadline for a code issued now.
pub fn code_expiry() -> DateTime<Utc> {
    Utc::now() + Duration::hours(CODE_TTL_HOURS)
}

/// Request to generate a code for a role.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenerateCodeRequest {
    #[validate(length(min = 1, message = "Role is required"))]
    pub role: String,
}

/// Request to manually expire an active code.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ExpireCodeRequest {
    #[validate(length(min = 1, message = "Code is required"))]
    pub code: String,
}

/// Response format for a single access code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AccessCodeResponse {
    pub role: Role,
    pub code: String,
    pub status: CodeStatus,
    pub expires_at: DateTime<Utc>,
}

impl From<AccessCode> for AccessCodeResponse {
    fn from(code: AccessCode) -> Self {
        Self {
            role: code.role,
            code: code.code,
            status: code.status,
            expires_at: code.expires_at,
        }
    }
}

/// Response format for the active-codes listing, annotated with the number
/// of seconds left before expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ActiveCodeResponse {
    pub role: Role,
    pub code: String,
    pub status: CodeStatus,
    pub expires_at: DateTime<Utc>,
    pub time_remaining: i64,
}

impl From<AccessCode> for ActiveCodeResponse {
    fn from(code: AccessCode) -> Self {
        let time_remaining = code.time_remaining_secs();
        Self {
            role: code.role,
            code: code.code,
            status: code.status,
            expires_at: code.expires_at,
            time_remaining,
        }
    }
}
