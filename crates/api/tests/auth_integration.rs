//! Integration tests for login, registration, profile, and password change.

mod common;

use axum::http::StatusCode;
use tower::ServiceExt;

#[tokio::test]
async fn test_manager_registers_with_admin_secret() {
    let _guard = common::db_lock().await;
    let Some(pool) = common::try_create_pool().await else {
        return;
    };
    common::cleanup(&pool).await;
    let app = common::create_test_app(pool.clone());

    let manager = common::register_manager(&app).await;

    // The returned token authenticates against the profile endpoint
    let response = app
        .clone()
        .oneshot(common::get_auth("/api/auth/profile", &manager.token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = common::parse_body(response).await;
    assert_eq!(body["user"]["email"], manager.email);
    assert_eq!(body["user"]["role"], "manager");

    // The static-secret path never touches the access_codes table
    let code_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM access_codes")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(code_rows, 0);
}

#[tokio::test]
async fn test_manager_registration_rejects_wrong_secret() {
    let _guard = common::db_lock().await;
    let Some(pool) = common::try_create_pool().await else {
        return;
    };
    common::cleanup(&pool).await;
    let app = common::create_test_app(pool);

    let response = app
        .oneshot(common::post_json(
            "/api/auth/register",
            serde_json::json!({
                "name": "Impostor",
                "email": common::unique_email(),
                "password": "IntegrationP@ss1",
                "role": "manager",
                "accessCode": "not-the-secret"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = common::parse_body(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_rotating_code_policy_gates_managers_by_code() {
    let _guard = common::db_lock().await;
    let Some(pool) = common::try_create_pool().await else {
        return;
    };
    common::cleanup(&pool).await;

    // Bootstrap a manager under the default static-secret policy; the token
    // stays valid across apps since they share the signing secret
    let static_app = common::create_test_app(pool.clone());
    let manager = common::register_manager(&static_app).await;

    let rotating_app = common::create_test_app_with(
        pool.clone(),
        &[("provisioning.manager_provisioning", "rotating_code")],
    );

    // Under rotating_code the admin secret is not a valid credential
    let response = rotating_app
        .clone()
        .oneshot(common::post_json(
            "/api/auth/register",
            serde_json::json!({
                "name": "Static Holdout",
                "email": common::unique_email(),
                "password": "IntegrationP@ss1",
                "role": "manager",
                "accessCode": common::TEST_ADMIN_SECRET
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Managers now register through the one-time code path like other roles
    let code = common::generate_code_as(&rotating_app, &manager.token, "manager").await;
    let response = rotating_app
        .clone()
        .oneshot(common::post_json(
            "/api/auth/register",
            serde_json::json!({
                "name": "Rotated Manager",
                "email": common::unique_email(),
                "password": "IntegrationP@ss1",
                "role": "manager",
                "accessCode": code.as_str()
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = common::parse_body(response).await;
    let token = body["token"].as_str().unwrap();

    let response = rotating_app
        .clone()
        .oneshot(common::get_auth("/api/auth/profile", token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::parse_body(response).await;
    assert_eq!(body["user"]["role"], "manager");

    // The consumed manager code is single-use here too
    let response = rotating_app
        .oneshot(common::post_json(
            "/api/auth/register",
            serde_json::json!({
                "name": "Replayer",
                "email": common::unique_email(),
                "password": "IntegrationP@ss1",
                "role": "manager",
                "accessCode": code.as_str()
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_farmer_self_registration_rejected() {
    let _guard = common::db_lock().await;
    let Some(pool) = common::try_create_pool().await else {
        return;
    };
    common::cleanup(&pool).await;
    let app = common::create_test_app(pool);

    let response = app
        .oneshot(common::post_json(
            "/api/auth/register",
            serde_json::json!({
                "name": "Hopeful Farmer",
                "email": common::unique_email(),
                "password": "IntegrationP@ss1",
                "role": "farmer",
                "accessCode": "A1B2C3D4"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::parse_body(response).await;
    assert!(body["message"].as_str().unwrap().contains("field officer"));
}

#[tokio::test]
async fn test_registration_requires_access_code() {
    let _guard = common::db_lock().await;
    let Some(pool) = common::try_create_pool().await else {
        return;
    };
    common::cleanup(&pool).await;
    let app = common::create_test_app(pool);

    let response = app
        .oneshot(common::post_json(
            "/api/auth/register",
            serde_json::json!({
                "name": "No Code",
                "email": common::unique_email(),
                "password": "IntegrationP@ss1",
                "role": "finance"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_registration_rejects_unknown_role() {
    let _guard = common::db_lock().await;
    let Some(pool) = common::try_create_pool().await else {
        return;
    };
    common::cleanup(&pool).await;
    let app = common::create_test_app(pool);

    let response = app
        .oneshot(common::post_json(
            "/api/auth/register",
            serde_json::json!({
                "name": "Nobody",
                "email": common::unique_email(),
                "password": "IntegrationP@ss1",
                "role": "superuser",
                "accessCode": "A1B2C3D4"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_field_officer_registers_with_generated_code() {
    let _guard = common::db_lock().await;
    let Some(pool) = common::try_create_pool().await else {
        return;
    };
    common::cleanup(&pool).await;
    let app = common::create_test_app(pool);

    let manager = common::register_manager(&app).await;
    let code = common::generate_code_as(&app, &manager.token, "field_officer").await;

    let officer = common::register_with_code(&app, "field_officer", &code).await;

    let response = app
        .clone()
        .oneshot(common::get_auth("/api/auth/profile", &officer.token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::parse_body(response).await;
    assert_eq!(body["user"]["role"], "field_officer");
}

#[tokio::test]
async fn test_code_is_single_use() {
    let _guard = common::db_lock().await;
    let Some(pool) = common::try_create_pool().await else {
        return;
    };
    common::cleanup(&pool).await;
    let app = common::create_test_app(pool);

    let manager = common::register_manager(&app).await;
    let code = common::generate_code_as(&app, &manager.token, "finance").await;

    common::register_with_code(&app, "finance", &code).await;

    // Second registration with the same code must fail
    let response = app
        .oneshot(common::post_json(
            "/api/auth/register",
            serde_json::json!({
                "name": "Second",
                "email": common::unique_email(),
                "password": "IntegrationP@ss1",
                "role": "finance",
                "accessCode": code
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_consumed_code_is_replenished() {
    let _guard = common::db_lock().await;
    let Some(pool) = common::try_create_pool().await else {
        return;
    };
    common::cleanup(&pool).await;
    let app = common::create_test_app(pool.clone());

    let manager = common::register_manager(&app).await;
    let code = common::generate_code_as(&app, &manager.token, "finance").await;

    common::register_with_code(&app, "finance", &code).await;

    // A fresh active code exists for the role, minted by the system
    let response = app
        .oneshot(common::get_auth("/api/access-codes/active", &manager.token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = common::parse_body(response).await;
    let finance_codes: Vec<_> = body
        .as_array()
        .unwrap()
        .iter()
        .filter(|c| c["role"] == "finance")
        .collect();
    assert_eq!(finance_codes.len(), 1);
    assert_ne!(finance_codes[0]["code"], code.as_str());

    let created_by: String =
        sqlx::query_scalar("SELECT created_by FROM access_codes WHERE code = $1")
            .bind(finance_codes[0]["code"].as_str().unwrap())
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(created_by, "system_auto");
}

#[tokio::test]
async fn test_duplicate_email_preserves_code() {
    let _guard = common::db_lock().await;
    let Some(pool) = common::try_create_pool().await else {
        return;
    };
    common::cleanup(&pool).await;
    let app = common::create_test_app(pool);

    let manager = common::register_manager(&app).await;
    let code = common::generate_code_as(&app, &manager.token, "finance").await;
    let existing = common::register_manager(&app).await;

    // Duplicate email fails before the code is touched...
    let response = app
        .clone()
        .oneshot(common::post_json(
            "/api/auth/register",
            serde_json::json!({
                "name": "Duplicate",
                "email": existing.email,
                "password": "IntegrationP@ss1",
                "role": "finance",
                "accessCode": code.as_str()
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // ...so the same code still works for a fresh email
    common::register_with_code(&app, "finance", &code).await;
}

#[tokio::test]
async fn test_code_lookup_is_case_insensitive() {
    let _guard = common::db_lock().await;
    let Some(pool) = common::try_create_pool().await else {
        return;
    };
    common::cleanup(&pool).await;
    let app = common::create_test_app(pool);

    let manager = common::register_manager(&app).await;
    let code = common::generate_code_as(&app, &manager.token, "field_officer").await;

    let lowered = format!("  {}  ", code.to_ascii_lowercase());
    common::register_with_code(&app, "field_officer", &lowered).await;
}

#[tokio::test]
async fn test_login_succeeds_and_fails_generically() {
    let _guard = common::db_lock().await;
    let Some(pool) = common::try_create_pool().await else {
        return;
    };
    common::cleanup(&pool).await;
    let app = common::create_test_app(pool);

    let manager = common::register_manager(&app).await;

    // Correct credentials
    let response = app
        .clone()
        .oneshot(common::post_json(
            "/api/auth/login",
            serde_json::json!({ "email": manager.email, "password": manager.password }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::parse_body(response).await;
    assert!(body["token"].as_str().is_some());
    assert_eq!(body["user"]["email"], manager.email);

    // Wrong password and unknown email produce identical messages
    let wrong_password = app
        .clone()
        .oneshot(common::post_json(
            "/api/auth/login",
            serde_json::json!({ "email": manager.email, "password": "WrongP@ssword1" }),
        ))
        .await
        .unwrap();
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    let wrong_password_body = common::parse_body(wrong_password).await;

    let unknown_email = app
        .oneshot(common::post_json(
            "/api/auth/login",
            serde_json::json!({ "email": common::unique_email(), "password": "WrongP@ssword1" }),
        ))
        .await
        .unwrap();
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
    let unknown_email_body = common::parse_body(unknown_email).await;

    assert_eq!(wrong_password_body["message"], unknown_email_body["message"]);
}

#[tokio::test]
async fn test_login_email_is_case_insensitive() {
    let _guard = common::db_lock().await;
    let Some(pool) = common::try_create_pool().await else {
        return;
    };
    common::cleanup(&pool).await;
    let app = common::create_test_app(pool);

    let manager = common::register_manager(&app).await;

    let response = app
        .oneshot(common::post_json(
            "/api/auth/login",
            serde_json::json!({
                "email": manager.email.to_uppercase(),
                "password": manager.password
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_profile_requires_token() {
    let _guard = common::db_lock().await;
    let Some(pool) = common::try_create_pool().await else {
        return;
    };
    let app = common::create_test_app(pool);

    let response = app
        .clone()
        .oneshot(
            axum::http::Request::builder()
                .method(axum::http::Method::GET)
                .uri("/api/auth/profile")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(common::get_auth("/api/auth/profile", "garbage-token"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_change_password_rotates_credentials() {
    let _guard = common::db_lock().await;
    let Some(pool) = common::try_create_pool().await else {
        return;
    };
    common::cleanup(&pool).await;
    let app = common::create_test_app(pool);

    let manager = common::register_manager(&app).await;
    let new_password = "RotatedP@ss1234";

    // Wrong current password is rejected
    let response = app
        .clone()
        .oneshot(common::post_json_auth(
            "/api/auth/change-password",
            serde_json::json!({
                "currentPassword": "WrongP@ssword1",
                "newPassword": new_password
            }),
            &manager.token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Correct current password succeeds
    let response = app
        .clone()
        .oneshot(common::post_json_auth(
            "/api/auth/change-password",
            serde_json::json!({
                "currentPassword": manager.password,
                "newPassword": new_password
            }),
            &manager.token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Old password no longer works, new one does
    let old_login = app
        .clone()
        .oneshot(common::post_json(
            "/api/auth/login",
            serde_json::json!({ "email": manager.email, "password": manager.password }),
        ))
        .await
        .unwrap();
    assert_eq!(old_login.status(), StatusCode::UNAUTHORIZED);

    let new_login = app
        .oneshot(common::post_json(
            "/api/auth/login",
            serde_json::json!({ "email": manager.email, "password": new_password }),
        ))
        .await
        .unwrap();
    assert_eq!(new_login.status(), StatusCode::OK);
}
