//! Tag API endpoints
//!
//! Handles HTTP requests for the tag hierarchy:
//! - GET /api/v1/tags - List all tags
//! - GET /api/v1/tags/roots - Tags without parents
//! - GET /api/v1/tags/relations - All parent/child edges
//! - GET /api/v1/tags/{id} - Tag by ID
//! - GET /api/v1/tags/{id}/subtree - Tag with all its descendants
//!
//! Admin only:
//! - POST /api/v1/tags - Create tag
//! - DELETE /api/v1/tags/{id} - Delete tag
//! - POST /api/v1/tags/relations - Add a parent/child edge
//! - DELETE /api/v1/tags/relations - Remove a parent/child edge

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState};
use crate::api::responses::TagInfo;
use crate::models::{CreateTagInput, TagRelation};

/// Request body for adding or removing a relation
#[derive(Debug, Deserialize)]
pub struct RelationRequest {
    pub parent_id: i64,
    pub child_id: i64,
}

/// Build the public tag router
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tags))
        .route("/roots", get(list_roots))
        .route("/relations", get(list_relations))
        .route("/{id}", get(get_tag))
        .route("/{id}/subtree", get(get_subtree))
}

/// Build the admin tag router (requires auth + admin middleware)
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_tag))
        .route("/relations", post(add_relation))
        .route("/relations", delete(remove_relation))
        .route("/{id}", delete(delete_tag))
}

/// GET /api/v1/tags - List all tags
async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<TagInfo>>, ApiError> {
    let tags = state.tag_service.list().await?;
    Ok(Json(tags.into_iter().map(TagInfo::from).collect()))
}

/// GET /api/v1/tags/roots - Tags without parents
async fn list_roots(State(state): State<AppState>) -> Result<Json<Vec<TagInfo>>, ApiError> {
    let tags = state.tag_service.roots().await?;
    Ok(Json(tags.into_iter().map(TagInfo::from).collect()))
}

/// GET /api/v1/tags/relations - All parent/child edges
async fn list_relations(
    State(state): State<AppState>,
) -> Result<Json<Vec<TagRelation>>, ApiError> {
    let relations = state.tag_service.relations().await?;
    Ok(Json(relations))
}

/// GET /api/v1/tags/{id} - Tag by ID
async fn get_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TagInfo>, ApiError> {
    let tag = state
        .tag_service
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Tag not found: {}", id)))?;
    Ok(Json(tag.into()))
}

/// GET /api/v1/tags/{id}/subtree - Tag with all its descendants
async fn get_subtree(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<TagInfo>>, ApiError> {
    let tags = state.tag_service.subtree(id).await?;
    Ok(Json(tags.into_iter().map(TagInfo::from).collect()))
}

/// POST /api/v1/tags - Create tag (admin)
async fn create_tag(
    State(state): State<AppState>,
    Json(body): Json<CreateTagInput>,
) -> Result<(StatusCode, Json<TagInfo>), ApiError> {
    let tag = state.tag_service.create(body).await?;
    Ok((StatusCode::CREATED, Json(tag.into())))
}

/// DELETE /api/v1/tags/{id} - Delete tag (admin)
async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.tag_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/tags/relations - Add a parent/child edge (admin)
///
/// Rejected with 409 when the pair is already connected in either
/// direction or the edge would close a cycle; the error message names
/// the offending tags.
async fn add_relation(
    State(state): State<AppState>,
    Json(body): Json<RelationRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .tag_service
        .add_relation(body.parent_id, body.child_id)
        .await?;
    Ok(StatusCode::CREATED)
}

/// DELETE /api/v1/tags/relations - Remove a parent/child edge (admin)
async fn remove_relation(
    State(state): State<AppState>,
    Json(body): Json<RelationRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .tag_service
        .remove_relation(body.parent_id, body.child_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
