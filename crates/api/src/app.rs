use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::error::ApiError;
use crate::middleware::{
    metrics_handler, metrics_middleware, require_auth, require_manager,
    security_headers_middleware, trace_id,
};
use crate::routes::{access_codes, auth, health};
use shared::jwt::JwtKeys;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub jwt: JwtKeys,
}

pub fn create_app(config: Config, pool: PgPool) -> Result<Router, ApiError> {
    let jwt = JwtKeys::with_leeway(
        &config.jwt.secret,
        config.jwt.token_expiry_secs,
        config.jwt.leeway_secs,
    )
    .map_err(|e| ApiError::Internal(format!("JWT configuration error: {}", e)))?;

    let config = Arc::new(config);
    let state = AppState {
        pool,
        config: config.clone(),
        jwt,
    };

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        // Production: only allow specified origins
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/register", post(auth::register))
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    // Protected routes (any authenticated user)
    let protected_routes = Router::new()
        .route("/api/auth/profile", get(auth::profile))
        .route("/api/auth/change-password", post(auth::change_password))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Manager routes: auth runs first (outermost), then the role check
    let manager_routes = Router::new()
        .route("/api/access-codes/generate", post(access_codes::generate))
        .route("/api/access-codes/active", get(access_codes::list_active))
        .route("/api/access-codes/history", get(access_codes::history))
        .route("/api/access-codes/expire", post(access_codes::expire))
        .route_layer(middleware::from_fn(require_manager))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Merge all routes
    Ok(Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(manager_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state))
}
