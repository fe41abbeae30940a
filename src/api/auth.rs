//! Authentication and account API endpoints
//!
//! Handles HTTP requests for accounts and sessions:
//! - POST /api/v1/auth/register - User registration
//! - POST /api/v1/auth/login - User login
//! - POST /api/v1/auth/logout - User logout
//! - GET /api/v1/auth/me - Get current user
//! - PUT /api/v1/auth/profile - Update current user's profile
//! - PATCH /api/v1/auth/subscription - Enable the newsletter subscription
//! - DELETE /api/v1/auth/subscription - Disable the newsletter subscription
//! - GET /api/v1/users/{id} - Public user profile with rating

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::UserResponse;
use crate::models::{CreateUserInput, UpdateUserInput};
use crate::services::user::{LoginInput, UserProfile, SESSION_TTL_DAYS};

/// Response for successful authentication
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(get_current_user))
        .route("/profile", put(update_profile))
        .route("/subscription", patch(subscribe))
        .route("/subscription", delete(unsubscribe))
}

fn session_cookie(token: &str) -> HeaderMap {
    let cookie = format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        token,
        SESSION_TTL_DAYS * 24 * 60 * 60
    );
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        headers.insert(header::SET_COOKIE, value);
    }
    headers
}

/// POST /api/v1/auth/register - User registration
///
/// Registers the user and opens a session in the same call.
async fn register(
    State(state): State<AppState>,
    Json(body): Json<CreateUserInput>,
) -> Result<impl IntoResponse, ApiError> {
    let password = body.password.clone();
    let user = state.user_service.register(body).await?;

    let (user, session) = state
        .user_service
        .login(LoginInput {
            email: user.email,
            password,
        })
        .await?;

    let headers = session_cookie(&session.id);
    Ok((
        StatusCode::CREATED,
        headers,
        Json(AuthResponse {
            user: user.into(),
            token: session.id,
        }),
    ))
}

/// POST /api/v1/auth/login - User login
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, session) = state.user_service.login(body).await?;

    let headers = session_cookie(&session.id);
    Ok((
        headers,
        Json(AuthResponse {
            user: user.into(),
            token: session.id,
        }),
    ))
}

/// POST /api/v1/auth/logout - User logout
///
/// Requires authentication.
async fn logout(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .or_else(|| {
            headers
                .get(header::COOKIE)
                .and_then(|h| h.to_str().ok())
                .and_then(|s| {
                    s.split(';')
                        .map(str::trim)
                        .find_map(|c| c.strip_prefix("session="))
                })
        })
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    state.user_service.logout(token).await?;

    // Clear the session cookie
    let clear_cookie = "session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0";
    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::SET_COOKIE, HeaderValue::from_static(clear_cookie));

    Ok((StatusCode::NO_CONTENT, response_headers))
}

/// GET /api/v1/auth/me - Get current user
async fn get_current_user(user: AuthenticatedUser) -> Json<UserResponse> {
    Json(user.0.into())
}

/// PUT /api/v1/auth/profile - Update current user's profile
async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<UpdateUserInput>,
) -> Result<Json<UserResponse>, ApiError> {
    let updated = state.user_service.update_profile(user.0.id, body).await?;
    Ok(Json(updated.into()))
}

/// PATCH /api/v1/auth/subscription - Subscribe to the newsletter
///
/// Returns 400 when the flag is already set.
async fn subscribe(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<StatusCode, ApiError> {
    state.user_service.set_subscribed(user.0.id, true).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/auth/subscription - Unsubscribe from the newsletter
///
/// Returns 400 when the flag is already cleared.
async fn unsubscribe(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<StatusCode, ApiError> {
    state.user_service.set_subscribed(user.0.id, false).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/users/{id} - Public user profile
///
/// Includes the author rating (sum of votes on the user's articles) and
/// the number of authored articles.
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = state.user_service.profile(id).await?;
    Ok(Json(profile))
}
