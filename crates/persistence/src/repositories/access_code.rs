//! Access code repository for database operations.
//!
//! Every state transition here is a single conditional UPDATE (or a short
//! transaction) with `status = 'active'` in the predicate, so two requests
//! racing on the same code cannot both win: zero rows matched is the
//! authoritative signal that another request got there first.

use chrono::{DateTime, Utc};
use domain::models::{AccessCode, Role, HISTORY_LIMIT};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::access_code::AccessCodeEntity;

const CODE_COLUMNS: &str =
    "id, role, code, status, created_by, created_at, expires_at, used_at, used_by";

/// Outcome of an attempted code consumption.
#[derive(Debug, Clone)]
pub enum ConsumeOutcome {
    /// The code was active and unexpired; it is now marked used.
    Consumed(AccessCode),
    /// The code was active but past its deadline; it is now marked expired.
    ExpiredAtValidation,
    /// No active code matched (wrong code, wrong role, already used/expired).
    NotFound,
}

/// Repository for access code database operations.
#[derive(Clone)]
pub struct AccessCodeRepository {
    pool: PgPool,
}

impl AccessCodeRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Expire every active code for the role and insert a fresh one, as one
    /// transaction.
    ///
    /// The transaction alone does not close the race between two concurrent
    /// rotations at READ COMMITTED: the second transaction's bulk-expire
    /// cannot see the row the first one inserted. The partial unique index
    /// on `(role) WHERE status = 'active'` is what holds the invariant; the
    /// losing insert surfaces a unique violation (23505).
    pub async fn rotate(
        &self,
        role: Role,
        code: &str,
        created_by: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<AccessCode, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let superseded = sqlx::query(
            r#"
            UPDATE access_codes
            SET status = 'expired', expires_at = NOW()
            WHERE role = $1 AND status = 'active'
            "#,
        )
        .bind(role)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let entity = sqlx::query_as::<_, AccessCodeEntity>(&format!(
            r#"
            INSERT INTO access_codes (id, role, code, status, created_by, created_at, expires_at)
            VALUES ($1, $2, $3, 'active', $4, NOW(), $5)
            RETURNING {CODE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(role)
        .bind(code)
        .bind(created_by)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        if superseded > 0 {
            tracing::debug!(role = %role, superseded, "Expired superseded access codes");
        }

        Ok(entity.into())
    }

    /// Atomically consume an active, unexpired code. A code that is active
    /// but past its deadline is flipped to expired instead, never to used.
    pub async fn consume(
        &self,
        code: &str,
        role: Role,
        used_by: &str,
    ) -> Result<ConsumeOutcome, sqlx::Error> {
        let consumed = sqlx::query_as::<_, AccessCodeEntity>(&format!(
            r#"
            UPDATE access_codes
            SET status = 'used', used_at = NOW(), used_by = $3
            WHERE code = $1 AND role = $2 AND status = 'active' AND expires_at > NOW()
            RETURNING {CODE_COLUMNS}
            "#
        ))
        .bind(code)
        .bind(role)
        .bind(used_by)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(entity) = consumed {
            return Ok(ConsumeOutcome::Consumed(entity.into()));
        }

        // Lazy expiry: an active row whose deadline passed is retired here,
        // at validation time.
        let expired = sqlx::query(
            r#"
            UPDATE access_codes
            SET status = 'expired'
            WHERE code = $1 AND role = $2 AND status = 'active' AND expires_at <= NOW()
            "#,
        )
        .bind(code)
        .bind(role)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if expired > 0 {
            Ok(ConsumeOutcome::ExpiredAtValidation)
        } else {
            Ok(ConsumeOutcome::NotFound)
        }
    }

    /// Force an active code to expired, matched by code value. Returns false
    /// when no active code matched (used, expired, or never existed).
    pub async fn expire_code(&self, code: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE access_codes
            SET status = 'expired', expires_at = NOW()
            WHERE code = $1 AND status = 'active'
            "#,
        )
        .bind(code)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Newest active, unexpired code per role.
    pub async fn list_active(&self) -> Result<Vec<AccessCode>, sqlx::Error> {
        let entities = sqlx::query_as::<_, AccessCodeEntity>(&format!(
            r#"
            SELECT DISTINCT ON (role) {CODE_COLUMNS}
            FROM access_codes
            WHERE status = 'active' AND expires_at > NOW()
            ORDER BY role, created_at DESC
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(entities.into_iter().map(Into::into).collect())
    }

    /// Most recent codes across all roles and statuses, for audit.
    pub async fn history(&self) -> Result<Vec<AccessCode>, sqlx::Error> {
        let entities = sqlx::query_as::<_, AccessCodeEntity>(&format!(
            r#"
            SELECT {CODE_COLUMNS}
            FROM access_codes
            ORDER BY created_at DESC
            LIMIT $1
            "#
        ))
        .bind(HISTORY_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(entities.into_iter().map(Into::into).collect())
    }
}
