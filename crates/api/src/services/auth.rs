//! Authentication service: login, access-code-gated registration, profile,
//! and password changes.

use domain::models::{code_expiry, generate_code, normalize_code, Role, User, SYSTEM_AUTO_ISSUER};
use persistence::repositories::{AccessCodeRepository, ConsumeOutcome, UserRepository};
use shared::jwt::{JwtError, JwtKeys};
use shared::password::{hash_password, verify_password, PasswordError};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{ManagerProvisioning, ProvisioningConfig};
use crate::middleware::metrics::{record_access_code_issued, record_registration};

/// Minimum accepted password length for new passwords.
const MIN_PASSWORD_LEN: usize = 8;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email and wrong password are deliberately indistinguishable.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Farmer accounts are created by a field officer; self-registration is not available for this role")]
    FarmerSelfRegistration,

    #[error("Invalid role: {0}")]
    UnknownRole(String),

    #[error("Access code is required")]
    AccessCodeRequired,

    /// Wrong code and consumed/superseded code are indistinguishable.
    #[error("Invalid or expired access code")]
    InvalidAccessCode,

    #[error("Access code has expired")]
    AccessCodeExpired,

    #[error("Email already registered")]
    EmailAlreadyExists,

    #[error("User not found")]
    UserNotFound,

    #[error("Current password is incorrect")]
    InvalidCurrentPassword,

    #[error("{0}")]
    WeakPassword(String),

    #[error("Token error: {0}")]
    TokenError(#[from] JwtError),

    #[error("Password error: {0}")]
    PasswordError(#[from] PasswordError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Result of a successful login or registration.
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub user: User,
    pub token: String,
}

/// Authentication service.
pub struct AuthService {
    users: UserRepository,
    codes: AccessCodeRepository,
    jwt: JwtKeys,
    provisioning: ProvisioningConfig,
}

impl AuthService {
    /// Creates a new service over the given pool and configuration.
    pub fn new(pool: PgPool, jwt: JwtKeys, provisioning: ProvisioningConfig) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            codes: AccessCodeRepository::new(pool),
            jwt,
            provisioning,
        }
    }

    /// Login with email and password.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResult, AuthError> {
        let email = email.trim().to_lowercase();

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        self.users.touch_last_login(user.id).await?;

        let token = self.issue_token(&user)?;
        Ok(AuthResult { user, token })
    }

    /// Register a new user for a privileged role, gated by an access code.
    ///
    /// Preconditions that do not depend on the code (role validity, email
    /// uniqueness) are checked first, so a request that is doomed anyway
    /// never consumes a one-time code.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: &str,
        access_code: Option<&str>,
    ) -> Result<AuthResult, AuthError> {
        let role: Role = role
            .parse()
            .map_err(|_| AuthError::UnknownRole(role.to_string()))?;

        if !role.self_registrable() {
            return Err(AuthError::FarmerSelfRegistration);
        }

        let access_code = access_code
            .filter(|c| !c.trim().is_empty())
            .ok_or(AuthError::AccessCodeRequired)?;

        let email = email.trim().to_lowercase();
        if self.users.email_exists(&email).await? {
            return Err(AuthError::EmailAlreadyExists);
        }

        if role == Role::Manager
            && self.provisioning.manager_provisioning == ManagerProvisioning::StaticSecret
        {
            // Managers are gated by the static admin secret under this
            // policy; the access_codes table is never touched.
            if access_code != self.provisioning.admin_secret {
                return Err(AuthError::InvalidAccessCode);
            }
        } else {
            self.consume_and_replenish(access_code, role, &email).await?;
        }

        let password_hash = hash_password(password)?;
        let user = match self.users.create(name, &email, &password_hash, role).await {
            Ok(user) => user,
            // Unique violation: concurrent registration won the email
            Err(sqlx::Error::Database(db_err))
                if db_err.code().as_deref() == Some("23505") =>
            {
                return Err(AuthError::EmailAlreadyExists);
            }
            Err(e) => return Err(e.into()),
        };

        record_registration(role.as_str());
        tracing::info!(user_id = %user.id, role = %role, "User registered");

        let token = self.issue_token(&user)?;
        Ok(AuthResult { user, token })
    }

    /// Consume the code for the role and immediately mint its replacement,
    /// so a role always has a ready next code.
    async fn consume_and_replenish(
        &self,
        raw_code: &str,
        role: Role,
        used_by: &str,
    ) -> Result<(), AuthError> {
        let code = normalize_code(raw_code);

        match self.codes.consume(&code, role, used_by).await? {
            ConsumeOutcome::Consumed(consumed) => {
                let replacement = self
                    .codes
                    .rotate(role, &generate_code(), SYSTEM_AUTO_ISSUER, code_expiry())
                    .await?;

                record_access_code_issued(role.as_str(), SYSTEM_AUTO_ISSUER);
                tracing::info!(
                    role = %role,
                    consumed_id = %consumed.id,
                    replacement_id = %replacement.id,
                    "Access code consumed and replenished"
                );
                Ok(())
            }
            ConsumeOutcome::ExpiredAtValidation => Err(AuthError::AccessCodeExpired),
            ConsumeOutcome::NotFound => Err(AuthError::InvalidAccessCode),
        }
    }

    /// Fetch the caller's own profile.
    pub async fn profile(&self, user_id: Uuid) -> Result<User, AuthError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Change the caller's password after verifying the current one.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if new_password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword(format!(
                "New password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !verify_password(current_password, &user.password_hash)? {
            return Err(AuthError::InvalidCurrentPassword);
        }

        let new_hash = hash_password(new_password)?;
        self.users.update_password(user.id, &new_hash).await?;

        tracing::info!(user_id = %user.id, "Password changed");
        Ok(())
    }

    fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        Ok(self
            .jwt
            .issue_token(user.id, &user.email, user.role.as_str(), &user.name)?)
    }
}
