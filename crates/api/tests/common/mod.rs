//! Common test utilities for integration tests.
//!
//! These tests run against a real PostgreSQL database. Set `TEST_DATABASE_URL`
//! to point at a disposable database; when it is unset every integration test
//! skips itself so the suite still passes without infrastructure.

// Allow dead code in this module - these are helper utilities that may not be
// used by every integration test binary.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request},
    Router,
};
use fmis_api::{app::create_app, config::Config};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

/// Admin secret baked into the test configuration.
pub const TEST_ADMIN_SECRET: &str = "test-admin-secret";

/// Serializes database tests. Access codes are global per role, so two tests
/// rotating codes for the same role would race each other.
pub async fn db_lock() -> MutexGuard<'static, ()> {
    static LOCK: Mutex<()> = Mutex::const_new(());
    LOCK.lock().await
}

/// Create a test database pool, or `None` when `TEST_DATABASE_URL` is unset.
pub async fn try_create_pool() -> Option<PgPool> {
    let database_url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("TEST_DATABASE_URL not set; skipping integration test");
            return None;
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    run_migrations(&pool).await;
    Some(pool)
}

/// Run migrations on the test database.
pub async fn run_migrations(pool: &PgPool) {
    sqlx::migrate!("../persistence/src/migrations")
        .run(pool)
        .await
        .expect("Failed to run migrations");
}

/// Remove all rows created by previous test runs.
pub async fn cleanup(pool: &PgPool) {
    for table in ["access_codes", "users"] {
        sqlx::query(&format!("TRUNCATE TABLE {} CASCADE", table))
            .execute(pool)
            .await
            .ok();
    }
}

/// Test configuration pointing at the test database.
pub fn test_config() -> Config {
    let database_url = std::env::var("TEST_DATABASE_URL").unwrap_or_default();
    Config::load_for_test(&[("database.url", database_url.as_str())])
        .expect("Failed to build test config")
}

/// Create a test application router.
pub fn create_test_app(pool: PgPool) -> Router {
    create_app(test_config(), pool).expect("Failed to build test app")
}

/// Create a test application router with extra config overrides, e.g. a
/// different manager provisioning policy.
pub fn create_test_app_with(pool: PgPool, overrides: &[(&str, &str)]) -> Router {
    let database_url = std::env::var("TEST_DATABASE_URL").unwrap_or_default();
    let mut all = vec![("database.url", database_url.as_str())];
    all.extend_from_slice(overrides);

    let config = Config::load_for_test(&all).expect("Failed to build test config");
    create_app(config, pool).expect("Failed to build test app")
}

/// Generate a unique email for testing.
pub fn unique_email() -> String {
    format!("test_{}@example.com", uuid::Uuid::new_v4().simple())
}

/// Build a JSON POST request.
pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Build a JSON POST request with a bearer token.
pub fn post_json_auth(uri: &str, body: serde_json::Value, token: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Build a GET request with a bearer token.
pub fn get_auth(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

/// Parse a JSON response body.
pub async fn parse_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
}

/// Registered user context.
pub struct RegisteredUser {
    pub email: String,
    pub password: String,
    pub token: String,
}

/// Register a manager through the API using the static admin secret.
pub async fn register_manager(app: &Router) -> RegisteredUser {
    register_with_code(app, "manager", TEST_ADMIN_SECRET).await
}

/// Register a user for the given role with the given access code. Panics on
/// any non-201 response.
pub async fn register_with_code(app: &Router, role: &str, code: &str) -> RegisteredUser {
    use fake::{faker::name::en::Name, Fake};
    use tower::ServiceExt;

    let name: String = Name().fake();
    let email = unique_email();
    let password = "IntegrationP@ss1".to_string();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/auth/register",
            serde_json::json!({
                "name": name,
                "email": email,
                "password": password,
                "role": role,
                "accessCode": code
            }),
        ))
        .await
        .unwrap();

    let status = response.status();
    let body = parse_body(response).await;
    assert_eq!(
        status,
        axum::http::StatusCode::CREATED,
        "Registration failed for role {}: {}",
        role,
        body
    );

    RegisteredUser {
        email,
        password,
        token: body["token"].as_str().expect("Missing token").to_string(),
    }
}

/// Have a manager generate an access code for the role, returning the code.
pub async fn generate_code_as(app: &Router, manager_token: &str, role: &str) -> String {
    use tower::ServiceExt;

    let response = app
        .clone()
        .oneshot(post_json_auth(
            "/api/access-codes/generate",
            serde_json::json!({ "role": role }),
            manager_token,
        ))
        .await
        .unwrap();

    let status = response.status();
    let body = parse_body(response).await;
    assert_eq!(
        status,
        axum::http::StatusCode::CREATED,
        "Code generation failed for role {}: {}",
        role,
        body
    );

    body["code"].as_str().expect("Missing code").to_string()
}
