//! API middleware
//!
//! Contains middleware for:
//! - Authentication (session token validation)
//! - Authorization (role checking)
//!
//! Plus the shared application state and the JSON error envelope used by
//! every handler.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::User;
use crate::services::{
    ArticleService, ArticleServiceError, CommentService, CommentServiceError, FavoriteService,
    FavoriteServiceError, TagService, TagServiceError, UserService, UserServiceError, VoteService,
    VoteServiceError,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: crate::db::DbHandle,
    pub user_service: Arc<UserService>,
    pub article_service: Arc<ArticleService>,
    pub tag_service: Arc<TagService>,
    pub vote_service: Arc<VoteService>,
    pub favorite_service: Arc<FavoriteService>,
    pub comment_service: Arc<CommentService>,
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::NotFound => ApiError::not_found("User not found"),
            UserServiceError::EmailTaken(_) => ApiError::conflict(err.to_string()),
            UserServiceError::InvalidCredentials => ApiError::unauthorized(err.to_string()),
            UserServiceError::InvalidSession => ApiError::unauthorized(err.to_string()),
            UserServiceError::SubscriptionUnchanged(_) => {
                ApiError::validation_error(err.to_string())
            }
            UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            UserServiceError::InternalError(e) => {
                tracing::error!("User service error: {:#}", e);
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<TagServiceError> for ApiError {
    fn from(err: TagServiceError) -> Self {
        match err {
            TagServiceError::NotFound(_) => ApiError::not_found(err.to_string()),
            TagServiceError::AlreadyExists(_) => ApiError::conflict(err.to_string()),
            TagServiceError::AlreadyConnected(_) | TagServiceError::HierarchyCycle(_) => {
                ApiError::conflict(err.to_string())
            }
            TagServiceError::RelationNotFound => ApiError::not_found(err.to_string()),
            TagServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            TagServiceError::InternalError(e) => {
                tracing::error!("Tag service error: {:#}", e);
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<ArticleServiceError> for ApiError {
    fn from(err: ArticleServiceError) -> Self {
        match err {
            ArticleServiceError::NotFound => ApiError::not_found("Article not found"),
            ArticleServiceError::TagNotFound(_) => ApiError::not_found(err.to_string()),
            ArticleServiceError::NotPermitted => ApiError::forbidden(err.to_string()),
            ArticleServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ArticleServiceError::InternalError(e) => {
                tracing::error!("Article service error: {:#}", e);
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<VoteServiceError> for ApiError {
    fn from(err: VoteServiceError) -> Self {
        match err {
            VoteServiceError::TargetNotFound => ApiError::not_found(err.to_string()),
            VoteServiceError::SelfVote => ApiError::forbidden(err.to_string()),
            VoteServiceError::InternalError(e) => {
                tracing::error!("Vote service error: {:#}", e);
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<FavoriteServiceError> for ApiError {
    fn from(err: FavoriteServiceError) -> Self {
        match err {
            FavoriteServiceError::ArticleNotFound => ApiError::not_found(err.to_string()),
            FavoriteServiceError::AlreadyFavorited | FavoriteServiceError::NotFavorited => {
                ApiError::validation_error(err.to_string())
            }
            FavoriteServiceError::InternalError(e) => {
                tracing::error!("Favorite service error: {:#}", e);
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<CommentServiceError> for ApiError {
    fn from(err: CommentServiceError) -> Self {
        match err {
            CommentServiceError::ArticleNotFound | CommentServiceError::NotFound => {
                ApiError::not_found(err.to_string())
            }
            CommentServiceError::NotPermitted => ApiError::forbidden(err.to_string()),
            CommentServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            CommentServiceError::InternalError(e) => {
                tracing::error!("Comment service error: {:#}", e);
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

// Extractor for AuthenticatedUser from request extensions
impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

// Lets handlers behind optional_auth take Option<AuthenticatedUser>
impl<S> axum::extract::OptionalFromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<AuthenticatedUser>().cloned())
    }
}

/// Extract session token from request
fn extract_session_token(request: &Request) -> Option<String> {
    if let Some(auth_header) = request.headers().get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    if let Some(cookie_header) = request.headers().get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                let cookie = cookie.trim();
                if let Some(token) = cookie.strip_prefix("session=") {
                    return Some(token.to_string());
                }
            }
        }
    }

    None
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(&request)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user = state
        .user_service
        .validate_session(&token)
        .await
        .map_err(ApiError::from)?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Optional authentication middleware
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_session_token(&request) {
        if let Ok(user) = state.user_service.validate_session(&token).await {
            request.extensions_mut().insert(AuthenticatedUser(user));
        }
    }
    next.run(request).await
}

/// Admin authorization middleware
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !user.0.is_admin() {
        return Err(ApiError::forbidden("Admin privileges required"));
    }

    Ok(next.run(request).await)
}
