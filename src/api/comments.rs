//! Comment API endpoints
//!
//! Handles HTTP requests for comments:
//! - GET /api/v1/articles/{id}/comments - List comments on an article
//! - POST /api/v1/articles/{id}/comments - Post a comment
//! - PUT /api/v1/comments/{id} - Edit a comment
//! - DELETE /api/v1/comments/{id} - Delete a comment
//! - POST /api/v1/comments/{id}/vote/{kind} - Cast or change a vote
//! - POST /api/v1/comments/{id}/unvote - Retract a vote

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post, put},
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::CommentResponse;
use crate::models::{CreateCommentInput, VoteTarget, VoteValue};

/// Build the protected comment router (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/{id}", put(update_comment))
        .route("/{id}", delete(delete_comment))
        .route("/{id}/vote/{kind}", post(vote))
        .route("/{id}/unvote", post(unvote))
}

/// GET /api/v1/articles/{id}/comments - List comments, oldest first
pub async fn list_comments(
    State(state): State<AppState>,
    Path(article_id): Path<i64>,
) -> Result<Json<Vec<CommentResponse>>, ApiError> {
    let comments = state.comment_service.list(article_id).await?;
    Ok(Json(comments.into_iter().map(CommentResponse::from).collect()))
}

/// POST /api/v1/articles/{id}/comments - Post a comment
pub async fn create_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(article_id): Path<i64>,
    Json(body): Json<CreateCommentInput>,
) -> Result<(StatusCode, Json<CommentResponse>), ApiError> {
    let comment = state
        .comment_service
        .create(&user.0, article_id, body)
        .await?;
    Ok((StatusCode::CREATED, Json(comment.into())))
}

/// PUT /api/v1/comments/{id} - Edit a comment
///
/// Only the author or a moderator may edit.
async fn update_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<CreateCommentInput>,
) -> Result<Json<CommentResponse>, ApiError> {
    let comment = state.comment_service.update(&user.0, id, &body.text).await?;
    Ok(Json(comment.into()))
}

/// DELETE /api/v1/comments/{id} - Delete a comment
async fn delete_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.comment_service.delete(&user.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/comments/{id}/vote/{kind} - Cast or change a vote
///
/// Comments share the vote ledger with articles, including the
/// self-vote rule.
async fn vote(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((id, kind)): Path<(i64, String)>,
) -> Result<StatusCode, ApiError> {
    let value = VoteValue::from_slug(&kind)
        .ok_or_else(|| ApiError::validation_error(format!("Unknown vote type: {}", kind)))?;

    state
        .vote_service
        .cast(user.0.id, VoteTarget::Comment(id), value)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/comments/{id}/unvote - Retract a vote
async fn unvote(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .vote_service
        .retract(user.0.id, VoteTarget::Comment(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
