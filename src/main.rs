//! Redakt - A content platform with hierarchical tags and a vote ledger

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use redakt::{
    api::{self, AppState},
    config::Config,
    db::{
        self,
        repositories::{
            SqlxArticleRepository, SqlxCommentRepository, SqlxFavoriteRepository,
            SqlxSessionRepository, SqlxTagRepository, SqlxUserRepository, SqlxVoteRepository,
        },
    },
    services::{
        article::ArticleService, comment::CommentService, favorite::FavoriteService,
        tag::TagService, user::UserService, vote::VoteService,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "redakt=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Redakt content platform...");

    // Load configuration
    let config = Config::load(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Create repositories
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());
    let article_repo = SqlxArticleRepository::boxed(pool.clone());
    let tag_repo = SqlxTagRepository::boxed(pool.clone());
    let vote_repo = SqlxVoteRepository::boxed(pool.clone());
    let favorite_repo = SqlxFavoriteRepository::boxed(pool.clone());
    let comment_repo = SqlxCommentRepository::boxed(pool.clone());

    // Initialize services
    let user_service = Arc::new(UserService::new(
        user_repo,
        session_repo.clone(),
        article_repo.clone(),
        vote_repo.clone(),
    ));
    let article_service = Arc::new(ArticleService::new(article_repo.clone(), tag_repo.clone()));
    let tag_service = Arc::new(TagService::new(tag_repo));
    let vote_service = Arc::new(VoteService::new(
        vote_repo,
        article_repo.clone(),
        comment_repo.clone(),
    ));
    let favorite_service = Arc::new(FavoriteService::new(favorite_repo, article_repo.clone()));
    let comment_service = Arc::new(CommentService::new(comment_repo, article_repo));

    // Build application state
    let state = AppState {
        pool: pool.clone(),
        user_service,
        article_service,
        tag_service,
        vote_service,
        favorite_service,
        comment_service,
    };

    // Expired session sweep (runs every hour)
    {
        let sessions = session_repo.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(3600));
            loop {
                interval.tick().await;
                match sessions.delete_expired().await {
                    Ok(removed) if removed > 0 => {
                        tracing::debug!(removed, "Swept expired sessions");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!("Failed to sweep expired sessions: {}", e),
                }
            }
        });
    }

    // Build router
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
