//! Article API endpoints
//!
//! Handles HTTP requests for articles and everything hanging off them:
//! - GET /api/v1/articles - List published articles (paginated)
//! - GET /api/v1/articles/popular - Most viewed articles
//! - GET /api/v1/articles/favorites - Current user's favorites
//! - GET /api/v1/articles/{id} - Article detail (increments view counter)
//! - POST /api/v1/articles - Create article
//! - PUT /api/v1/articles/{id} - Update article
//! - DELETE /api/v1/articles/{id} - Delete article
//! - POST /api/v1/articles/{id}/tags - Attach tags (with ancestor propagation)
//! - DELETE /api/v1/articles/{id}/tags - Detach tags
//! - GET /api/v1/articles/{id}/voters/{kind} - Users who reacted with a value
//! - POST /api/v1/articles/{id}/vote/{kind} - Cast or change a vote
//! - POST /api/v1/articles/{id}/unvote - Retract a vote
//! - POST /api/v1/articles/{id}/favorite - Add to favorites
//! - DELETE /api/v1/articles/{id}/favorite - Remove from favorites

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::api::responses::{
    ArticleResponse, ArticleSummary, PaginatedArticlesResponse, TagInfo,
};
use crate::models::{
    Article, CreateArticleInput, ListParams, UpdateArticleInput, VoteTarget, VoteValue,
};

/// Query parameters for article listing
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub author: Option<i64>,
}

/// Query parameters for the popular listing
#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    pub limit: Option<usize>,
}

/// Request body for attaching or detaching tags
#[derive(Debug, Deserialize)]
pub struct TagIdsRequest {
    pub tags: Vec<i64>,
}

/// Build the public article router
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_articles))
        .route("/popular", get(popular_articles))
        .route("/{id}/tags", get(get_article_tags))
        .route("/{id}/voters/{kind}", get(list_voters))
}

/// Build the protected article router (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_article))
        .route("/favorites", get(list_favorites))
        .route("/{id}", put(update_article))
        .route("/{id}", delete(delete_article))
        .route("/{id}/tags", post(attach_tags))
        .route("/{id}/tags", delete(detach_tags))
        .route("/{id}/vote/{kind}", post(vote))
        .route("/{id}/unvote", post(unvote))
        .route("/{id}/favorite", post(favorite))
        .route("/{id}/favorite", delete(unfavorite))
}

/// GET /api/v1/articles - List published articles
async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<PaginatedArticlesResponse>, ApiError> {
    let params = ListParams::new(query.page.unwrap_or(1), query.per_page.unwrap_or(10));

    let result = match query.author {
        Some(author_id) => {
            state
                .article_service
                .list_by_author(author_id, &params)
                .await?
        }
        None => state.article_service.list(&params).await?,
    };

    Ok(Json(result.into()))
}

/// GET /api/v1/articles/popular - Most viewed articles
async fn popular_articles(
    State(state): State<AppState>,
    Query(query): Query<PopularQuery>,
) -> Result<Json<Vec<ArticleSummary>>, ApiError> {
    let articles = state
        .article_service
        .popular(query.limit.unwrap_or(10))
        .await?;
    Ok(Json(articles.into_iter().map(ArticleSummary::from).collect()))
}

/// GET /api/v1/articles/{id} - Article detail
///
/// Every successful read increments the view counter; the returned
/// `views_count` includes this read. Reaction and favorite flags reflect
/// the requesting user when authenticated.
pub async fn get_article(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
    Path(id): Path<i64>,
) -> Result<Json<ArticleResponse>, ApiError> {
    let article = state.article_service.read(id).await?;
    let viewer = user.map(|u| u.0.id);

    build_article_response(&state, article, viewer).await
}

/// POST /api/v1/articles - Create article
async fn create_article(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateArticleInput>,
) -> Result<(StatusCode, Json<ArticleResponse>), ApiError> {
    let article = state.article_service.create(&user.0, body).await?;
    let viewer = Some(user.0.id);

    let response = build_article_response(&state, article, viewer).await?;
    Ok((StatusCode::CREATED, response))
}

/// PUT /api/v1/articles/{id} - Update article
///
/// Only the author or a moderator may update.
async fn update_article(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<UpdateArticleInput>,
) -> Result<Json<ArticleResponse>, ApiError> {
    let article = state.article_service.update(&user.0, id, body).await?;
    let viewer = Some(user.0.id);

    build_article_response(&state, article, viewer).await
}

/// DELETE /api/v1/articles/{id} - Delete article
async fn delete_article(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.article_service.delete(&user.0, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/articles/{id}/tags - Tags attached to an article
async fn get_article_tags(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<TagInfo>>, ApiError> {
    if state.article_service.get(id).await?.is_none() {
        return Err(ApiError::not_found("Article not found"));
    }
    let tags = state.article_service.article_tags(id).await?;
    Ok(Json(tags.into_iter().map(TagInfo::from).collect()))
}

/// POST /api/v1/articles/{id}/tags - Attach tags
///
/// Ancestors of the requested tags are attached as well. Returns the
/// full tag set of the article after the change.
async fn attach_tags(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<TagIdsRequest>,
) -> Result<Json<Vec<TagInfo>>, ApiError> {
    let tags = state
        .article_service
        .attach_tags(&user.0, id, &body.tags)
        .await?;
    Ok(Json(tags.into_iter().map(TagInfo::from).collect()))
}

/// DELETE /api/v1/articles/{id}/tags - Detach tags
///
/// Descendants of the requested tags are detached too, unless still
/// justified by a remaining tag. Returns the remaining tag set.
async fn detach_tags(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<TagIdsRequest>,
) -> Result<Json<Vec<TagInfo>>, ApiError> {
    let tags = state
        .article_service
        .detach_tags(&user.0, id, &body.tags)
        .await?;
    Ok(Json(tags.into_iter().map(TagInfo::from).collect()))
}

/// POST /api/v1/articles/{id}/vote/{kind} - Cast or change a vote
///
/// `kind` is `like` or `dislike`; anything else is a validation error.
/// Voting on your own article is forbidden.
async fn vote(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((id, kind)): Path<(i64, String)>,
) -> Result<StatusCode, ApiError> {
    let value = VoteValue::from_slug(&kind)
        .ok_or_else(|| ApiError::validation_error(format!("Unknown vote type: {}", kind)))?;

    state
        .vote_service
        .cast(user.0.id, VoteTarget::Article(id), value)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/articles/{id}/voters/{kind} - Users who reacted with `kind`
async fn list_voters(
    State(state): State<AppState>,
    Path((id, kind)): Path<(i64, String)>,
) -> Result<Json<Vec<i64>>, ApiError> {
    let value = VoteValue::from_slug(&kind)
        .ok_or_else(|| ApiError::validation_error(format!("Unknown vote type: {}", kind)))?;

    let voters = state
        .vote_service
        .voters(VoteTarget::Article(id), value)
        .await?;
    Ok(Json(voters))
}

/// POST /api/v1/articles/{id}/unvote - Retract a vote
async fn unvote(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .vote_service
        .retract(user.0.id, VoteTarget::Article(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/articles/{id}/favorite - Add to favorites
async fn favorite(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.favorite_service.favorite(user.0.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/articles/{id}/favorite - Remove from favorites
async fn unfavorite(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.favorite_service.unfavorite(user.0.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/articles/favorites - Current user's favorites
async fn list_favorites(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<ArticleSummary>>, ApiError> {
    let articles = state.favorite_service.list(user.0.id).await?;
    Ok(Json(articles.into_iter().map(ArticleSummary::from).collect()))
}

async fn build_article_response(
    state: &AppState,
    article: Article,
    viewer: Option<i64>,
) -> Result<Json<ArticleResponse>, ApiError> {
    let tags = state.article_service.article_tags(article.id).await?;
    let reactions = state
        .vote_service
        .reactions(VoteTarget::Article(article.id), viewer)
        .await?;
    let is_favorited = state
        .favorite_service
        .is_favorited(viewer, article.id)
        .await?;

    Ok(Json(ArticleResponse::build(
        article,
        tags,
        reactions,
        is_favorited,
    )))
}
