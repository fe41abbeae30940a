//! Favorite service
//!
//! Business logic for the favorite-articles ledger.

use crate::db::repositories::{ArticleRepository, FavoriteRepository};
use crate::models::Article;
use anyhow::Context;
use std::sync::Arc;

/// Error types for favorite service operations
#[derive(Debug, thiserror::Error)]
pub enum FavoriteServiceError {
    /// Article not found
    #[error("Article not found")]
    ArticleNotFound,

    /// The article is already in the user's favorites
    #[error("Article is already favorited")]
    AlreadyFavorited,

    /// The article is not in the user's favorites
    #[error("Article is not favorited yet")]
    NotFavorited,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Favorite service
pub struct FavoriteService {
    favorites: Arc<dyn FavoriteRepository>,
    articles: Arc<dyn ArticleRepository>,
}

impl FavoriteService {
    /// Create a new favorite service
    pub fn new(favorites: Arc<dyn FavoriteRepository>, articles: Arc<dyn ArticleRepository>) -> Self {
        Self {
            favorites,
            articles,
        }
    }

    /// Add an article to the user's favorites
    ///
    /// # Errors
    /// - `ArticleNotFound` if the article does not exist
    /// - `AlreadyFavorited` if the pair already exists
    pub async fn favorite(&self, user_id: i64, article_id: i64) -> Result<(), FavoriteServiceError> {
        self.require_article(article_id).await?;

        let added = self
            .favorites
            .add(user_id, article_id)
            .await
            .context("Failed to add favorite")?;
        if !added {
            return Err(FavoriteServiceError::AlreadyFavorited);
        }
        Ok(())
    }

    /// Remove an article from the user's favorites
    ///
    /// # Errors
    /// - `ArticleNotFound` if the article does not exist
    /// - `NotFavorited` if the pair does not exist
    pub async fn unfavorite(
        &self,
        user_id: i64,
        article_id: i64,
    ) -> Result<(), FavoriteServiceError> {
        self.require_article(article_id).await?;

        let removed = self
            .favorites
            .remove(user_id, article_id)
            .await
            .context("Failed to remove favorite")?;
        if !removed {
            return Err(FavoriteServiceError::NotFavorited);
        }
        Ok(())
    }

    /// Check whether a user has favorited an article.
    /// Anonymous viewers are never favoriters.
    pub async fn is_favorited(
        &self,
        user_id: Option<i64>,
        article_id: i64,
    ) -> Result<bool, FavoriteServiceError> {
        match user_id {
            Some(user_id) => self
                .favorites
                .exists(user_id, article_id)
                .await
                .context("Failed to check favorite")
                .map_err(Into::into),
            None => Ok(false),
        }
    }

    /// Articles the user has favorited, most recently favorited first
    pub async fn list(&self, user_id: i64) -> Result<Vec<Article>, FavoriteServiceError> {
        let ids = self
            .favorites
            .article_ids_for_user(user_id)
            .await
            .context("Failed to list favorites")?;
        self.articles
            .get_by_ids(&ids)
            .await
            .context("Failed to load favorited articles")
            .map_err(Into::into)
    }

    async fn require_article(&self, article_id: i64) -> Result<(), FavoriteServiceError> {
        if self
            .articles
            .get_by_id(article_id)
            .await
            .context("Failed to load article")?
            .is_none()
        {
            return Err(FavoriteServiceError::ArticleNotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        ArticleRepository, SqlxArticleRepository, SqlxFavoriteRepository, SqlxUserRepository,
        UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{User, UserRole};
    use chrono::Utc;

    async fn setup() -> (FavoriteService, i64, i64) {
        let pool = create_test_pool().await.expect("Failed to create pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::boxed(pool.clone());
        let user = users
            .create(&User {
                id: 0,
                email: "reader@example.com".to_string(),
                first_name: "R".to_string(),
                last_name: "Eader".to_string(),
                password_hash: "hash".to_string(),
                role: UserRole::User,
                subscribed: false,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await
            .expect("Failed to create user");

        let articles = SqlxArticleRepository::boxed(pool.clone());
        let article = articles
            .create(&crate::models::Article {
                id: 0,
                title: "T".to_string(),
                text: "body".to_string(),
                source_name: None,
                source_link: None,
                is_published: true,
                views_count: 0,
                reading_time: 1,
                author_id: user.id,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await
            .expect("Failed to create article");

        let service = FavoriteService::new(SqlxFavoriteRepository::boxed(pool.clone()), articles);
        (service, user.id, article.id)
    }

    #[tokio::test]
    async fn test_favorite_twice_is_conflict() {
        let (service, user_id, article_id) = setup().await;

        service.favorite(user_id, article_id).await.unwrap();
        assert!(matches!(
            service.favorite(user_id, article_id).await.unwrap_err(),
            FavoriteServiceError::AlreadyFavorited
        ));
    }

    #[tokio::test]
    async fn test_unfavorite_requires_existing_pair() {
        let (service, user_id, article_id) = setup().await;

        assert!(matches!(
            service.unfavorite(user_id, article_id).await.unwrap_err(),
            FavoriteServiceError::NotFavorited
        ));

        service.favorite(user_id, article_id).await.unwrap();
        service.unfavorite(user_id, article_id).await.unwrap();
        assert!(!service.is_favorited(Some(user_id), article_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_article_is_not_found() {
        let (service, user_id, _) = setup().await;

        assert!(matches!(
            service.favorite(user_id, 9999).await.unwrap_err(),
            FavoriteServiceError::ArticleNotFound
        ));
    }

    #[tokio::test]
    async fn test_list_and_anonymous_flag() {
        let (service, user_id, article_id) = setup().await;

        service.favorite(user_id, article_id).await.unwrap();
        let favorites = service.list(user_id).await.unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].id, article_id);

        assert!(!service.is_favorited(None, article_id).await.unwrap());
    }
}
