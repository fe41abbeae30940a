//! API layer - HTTP handlers and routing
//!
//! This module contains all HTTP API endpoints for the Redakt content
//! platform:
//! - Auth and account endpoints
//! - Article endpoints (including votes and favorites)
//! - Tag hierarchy endpoints
//! - Comment endpoints

pub mod articles;
pub mod auth;
pub mod comments;
pub mod middleware;
pub mod responses;
pub mod tags;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    middleware as axum_middleware,
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes (need admin role)
    let admin_routes = Router::new()
        .nest("/tags", tags::admin_router())
        .route_layer(axum_middleware::from_fn(middleware::require_admin))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Protected routes (need auth but not admin)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .nest("/articles", articles::protected_router())
        .nest("/comments", comments::protected_router())
        .route(
            "/articles/{id}/comments",
            axum::routing::post(comments::create_comment),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Routes that adapt to an authenticated viewer but allow anonymous access
    let optional_auth_routes = Router::new()
        .route("/articles/{id}", get(articles::get_article))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_auth,
        ));

    // Public routes
    Router::new()
        .nest("/auth", auth::public_router())
        .nest("/articles", articles::public_router())
        .nest("/tags", tags::public_router())
        .route("/users/{id}", get(auth::get_profile))
        .route("/articles/{id}/comments", get(comments::list_comments))
        .merge(optional_auth_routes)
        .merge(admin_routes)
        .merge(protected_routes)
}

/// Health check endpoint
async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    state
        .pool
        .ping()
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let mut cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);
    if let Ok(origin) = cors_origin.parse::<HeaderValue>() {
        cors = cors.allow_origin(origin);
    } else {
        tracing::warn!(cors_origin, "Invalid CORS origin, allowing none");
    }

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
