//! Article service
//!
//! Business logic for publications:
//! - Creation with reading time estimation and tag attachment
//! - Listing, popularity ranking, and view counting
//! - Ownership checks for updates and deletion
//! - Tag attach/detach with hierarchy propagation

use crate::db::repositories::{ArticleRepository, TagRepository};
use crate::models::{
    estimate_reading_time, Article, CreateArticleInput, ListParams, PagedResult, Tag,
    UpdateArticleInput, User,
};
use anyhow::Context;
use std::sync::Arc;

/// Error types for article service operations
#[derive(Debug, thiserror::Error)]
pub enum ArticleServiceError {
    /// Article not found
    #[error("Article not found")]
    NotFound,

    /// Tag not found
    #[error("Tag not found: {0}")]
    TagNotFound(i64),

    /// Actor is not allowed to modify the article
    #[error("Not allowed to modify this article")]
    NotPermitted,

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Article service
pub struct ArticleService {
    articles: Arc<dyn ArticleRepository>,
    tags: Arc<dyn TagRepository>,
}

impl ArticleService {
    /// Create a new article service
    pub fn new(articles: Arc<dyn ArticleRepository>, tags: Arc<dyn TagRepository>) -> Self {
        Self { articles, tags }
    }

    /// Create a new article authored by `author`.
    ///
    /// Reading time is estimated from the body. Requested tags are attached
    /// with ancestor propagation.
    pub async fn create(
        &self,
        author: &User,
        input: CreateArticleInput,
    ) -> Result<Article, ArticleServiceError> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(ArticleServiceError::ValidationError(
                "Title cannot be empty".to_string(),
            ));
        }
        if input.text.trim().is_empty() {
            return Err(ArticleServiceError::ValidationError(
                "Article text cannot be empty".to_string(),
            ));
        }

        for &tag_id in &input.tags {
            if self
                .tags
                .get_by_id(tag_id)
                .await
                .context("Failed to check tag")?
                .is_none()
            {
                return Err(ArticleServiceError::TagNotFound(tag_id));
            }
        }

        let now = chrono::Utc::now();
        let article = Article {
            id: 0,
            reading_time: estimate_reading_time(&input.text),
            title,
            text: input.text,
            source_name: input.source_name,
            source_link: input.source_link,
            is_published: input.is_published,
            views_count: 0,
            author_id: author.id,
            created_at: now,
            updated_at: now,
        };

        let created = self
            .articles
            .create(&article)
            .await
            .context("Failed to create article")?;

        if !input.tags.is_empty() {
            self.tags
                .attach_to_article(created.id, &input.tags)
                .await
                .context("Failed to attach tags")?;
        }

        tracing::info!(article_id = created.id, author_id = author.id, "Created article");
        Ok(created)
    }

    /// Get an article by ID
    pub async fn get(&self, id: i64) -> Result<Option<Article>, ArticleServiceError> {
        self.articles
            .get_by_id(id)
            .await
            .context("Failed to get article")
            .map_err(Into::into)
    }

    /// Get an article for a detail read, counting the view.
    ///
    /// The increment happens before the read, so the returned count already
    /// includes this view.
    pub async fn read(&self, id: i64) -> Result<Article, ArticleServiceError> {
        if self
            .articles
            .get_by_id(id)
            .await
            .context("Failed to get article")?
            .is_none()
        {
            return Err(ArticleServiceError::NotFound);
        }

        self.articles
            .increment_views(id)
            .await
            .context("Failed to count view")?;
        self.articles
            .get_by_id(id)
            .await
            .context("Failed to reload article")?
            .ok_or(ArticleServiceError::NotFound)
    }

    /// List published articles, newest first
    pub async fn list(&self, params: &ListParams) -> Result<PagedResult<Article>, ArticleServiceError> {
        self.articles
            .list_published(params)
            .await
            .context("Failed to list articles")
            .map_err(Into::into)
    }

    /// List articles by author (includes drafts)
    pub async fn list_by_author(
        &self,
        author_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<Article>, ArticleServiceError> {
        self.articles
            .list_by_author(author_id, params)
            .await
            .context("Failed to list author articles")
            .map_err(Into::into)
    }

    /// List the most viewed published articles
    pub async fn popular(&self, limit: usize) -> Result<Vec<Article>, ArticleServiceError> {
        self.articles
            .list_popular(limit.clamp(1, 100))
            .await
            .context("Failed to list popular articles")
            .map_err(Into::into)
    }

    /// Update an article. Only the author or a moderator may edit.
    pub async fn update(
        &self,
        actor: &User,
        id: i64,
        input: UpdateArticleInput,
    ) -> Result<Article, ArticleServiceError> {
        let mut article = self.authorize(actor, id).await?;

        if !input.has_changes() {
            return Ok(article);
        }

        if let Some(title) = input.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(ArticleServiceError::ValidationError(
                    "Title cannot be empty".to_string(),
                ));
            }
            article.title = title;
        }
        if let Some(text) = input.text {
            if text.trim().is_empty() {
                return Err(ArticleServiceError::ValidationError(
                    "Article text cannot be empty".to_string(),
                ));
            }
            article.reading_time = estimate_reading_time(&text);
            article.text = text;
        }
        if input.source_name.is_some() {
            article.source_name = input.source_name;
        }
        if input.source_link.is_some() {
            article.source_link = input.source_link;
        }
        if let Some(is_published) = input.is_published {
            article.is_published = is_published;
        }

        self.articles
            .update(&article)
            .await
            .context("Failed to update article")?;

        self.articles
            .get_by_id(id)
            .await
            .context("Failed to reload article")?
            .ok_or(ArticleServiceError::NotFound)
    }

    /// Delete an article. Only the author or a moderator may delete.
    pub async fn delete(&self, actor: &User, id: i64) -> Result<(), ArticleServiceError> {
        self.authorize(actor, id).await?;
        self.articles
            .delete(id)
            .await
            .context("Failed to delete article")?;
        tracing::info!(article_id = id, actor_id = actor.id, "Deleted article");
        Ok(())
    }

    /// Attach tags to an article with ancestor propagation.
    /// Returns the article's full tag set after the change.
    pub async fn attach_tags(
        &self,
        actor: &User,
        id: i64,
        tag_ids: &[i64],
    ) -> Result<Vec<Tag>, ArticleServiceError> {
        self.authorize(actor, id).await?;
        for &tag_id in tag_ids {
            if self
                .tags
                .get_by_id(tag_id)
                .await
                .context("Failed to check tag")?
                .is_none()
            {
                return Err(ArticleServiceError::TagNotFound(tag_id));
            }
        }

        self.tags
            .attach_to_article(id, tag_ids)
            .await
            .context("Failed to attach tags")?;
        self.article_tags(id).await
    }

    /// Detach tags from an article, also removing attached descendants that
    /// would otherwise imply the removed tags. Returns the remaining tags.
    pub async fn detach_tags(
        &self,
        actor: &User,
        id: i64,
        tag_ids: &[i64],
    ) -> Result<Vec<Tag>, ArticleServiceError> {
        self.authorize(actor, id).await?;
        self.tags
            .detach_from_article(id, tag_ids)
            .await
            .context("Failed to detach tags")?;
        self.article_tags(id).await
    }

    /// Tags currently attached to an article
    pub async fn article_tags(&self, id: i64) -> Result<Vec<Tag>, ArticleServiceError> {
        self.tags
            .get_by_article_id(id)
            .await
            .context("Failed to load article tags")
            .map_err(Into::into)
    }

    async fn authorize(&self, actor: &User, id: i64) -> Result<Article, ArticleServiceError> {
        let article = self
            .articles
            .get_by_id(id)
            .await
            .context("Failed to get article")?
            .ok_or(ArticleServiceError::NotFound)?;

        if article.author_id != actor.id && !actor.is_moderator() {
            return Err(ArticleServiceError::NotPermitted);
        }
        Ok(article)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxArticleRepository, SqlxTagRepository, SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{CreateTagInput, UserRole};
    use crate::services::TagService;

    struct Fixture {
        articles: ArticleService,
        tags: TagService,
        users: Arc<dyn UserRepository>,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let tag_repo = SqlxTagRepository::boxed(pool.clone());
        Fixture {
            articles: ArticleService::new(
                SqlxArticleRepository::boxed(pool.clone()),
                tag_repo.clone(),
            ),
            tags: TagService::new(tag_repo),
            users: SqlxUserRepository::boxed(pool),
        }
    }

    async fn make_user(fx: &Fixture, email: &str, role: UserRole) -> User {
        fx.users
            .create(&User {
                id: 0,
                email: email.to_string(),
                first_name: "U".to_string(),
                last_name: "Ser".to_string(),
                password_hash: "hash".to_string(),
                role,
                subscribed: false,
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
            })
            .await
            .expect("Failed to create user")
    }

    fn draft(title: &str, tags: Vec<i64>) -> CreateArticleInput {
        CreateArticleInput {
            title: title.to_string(),
            text: "word ".repeat(250),
            source_name: None,
            source_link: None,
            is_published: true,
            tags,
        }
    }

    #[tokio::test]
    async fn test_create_estimates_reading_time() {
        let fx = setup().await;
        let author = make_user(&fx, "a@example.com", UserRole::User).await;

        let article = fx.articles.create(&author, draft("Hello", vec![])).await.unwrap();
        // 250 words at 200 wpm rounds up to 2 minutes
        assert_eq!(article.reading_time, 2);
    }

    #[tokio::test]
    async fn test_create_attaches_tags_with_propagation() {
        let fx = setup().await;
        let author = make_user(&fx, "a@example.com", UserRole::User).await;

        let root = fx
            .tags
            .create(CreateTagInput {
                name: "Programming".to_string(),
                slug: None,
            })
            .await
            .unwrap();
        let leaf = fx
            .tags
            .create(CreateTagInput {
                name: "Rust".to_string(),
                slug: None,
            })
            .await
            .unwrap();
        fx.tags.add_relation(root.id, leaf.id).await.unwrap();

        let article = fx
            .articles
            .create(&author, draft("Tagged", vec![leaf.id]))
            .await
            .unwrap();

        let attached = fx.articles.article_tags(article.id).await.unwrap();
        assert_eq!(attached.len(), 2);
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_tag() {
        let fx = setup().await;
        let author = make_user(&fx, "a@example.com", UserRole::User).await;

        let err = fx
            .articles
            .create(&author, draft("Bad", vec![9999]))
            .await
            .unwrap_err();
        assert!(matches!(err, ArticleServiceError::TagNotFound(9999)));
    }

    #[tokio::test]
    async fn test_read_counts_view() {
        let fx = setup().await;
        let author = make_user(&fx, "a@example.com", UserRole::User).await;
        let article = fx.articles.create(&author, draft("Viewed", vec![])).await.unwrap();

        let first = fx.articles.read(article.id).await.unwrap();
        assert_eq!(first.views_count, 1);
        let second = fx.articles.read(article.id).await.unwrap();
        assert_eq!(second.views_count, 2);

        assert!(matches!(
            fx.articles.read(9999).await.unwrap_err(),
            ArticleServiceError::NotFound
        ));
    }

    #[tokio::test]
    async fn test_update_requires_ownership() {
        let fx = setup().await;
        let author = make_user(&fx, "a@example.com", UserRole::User).await;
        let stranger = make_user(&fx, "s@example.com", UserRole::User).await;
        let moderator = make_user(&fx, "m@example.com", UserRole::Moderator).await;

        let article = fx.articles.create(&author, draft("Mine", vec![])).await.unwrap();

        let update = UpdateArticleInput {
            title: Some("Touched".to_string()),
            ..Default::default()
        };

        let err = fx
            .articles
            .update(&stranger, article.id, update.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, ArticleServiceError::NotPermitted));

        // Moderators may edit anything
        let updated = fx
            .articles
            .update(&moderator, article.id, update)
            .await
            .unwrap();
        assert_eq!(updated.title, "Touched");
    }

    #[tokio::test]
    async fn test_update_recomputes_reading_time() {
        let fx = setup().await;
        let author = make_user(&fx, "a@example.com", UserRole::User).await;
        let article = fx.articles.create(&author, draft("Short", vec![])).await.unwrap();

        let updated = fx
            .articles
            .update(
                &author,
                article.id,
                UpdateArticleInput {
                    text: Some("just a few words now".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.reading_time, 1);
    }

    #[tokio::test]
    async fn test_delete_requires_ownership() {
        let fx = setup().await;
        let author = make_user(&fx, "a@example.com", UserRole::User).await;
        let stranger = make_user(&fx, "s@example.com", UserRole::User).await;
        let article = fx.articles.create(&author, draft("Mine", vec![])).await.unwrap();

        assert!(matches!(
            fx.articles.delete(&stranger, article.id).await.unwrap_err(),
            ArticleServiceError::NotPermitted
        ));

        fx.articles.delete(&author, article.id).await.unwrap();
        assert!(fx.articles.get(article.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_detach_tags_with_propagation() {
        let fx = setup().await;
        let author = make_user(&fx, "a@example.com", UserRole::User).await;

        let root = fx
            .tags
            .create(CreateTagInput {
                name: "Programming".to_string(),
                slug: None,
            })
            .await
            .unwrap();
        let mid = fx
            .tags
            .create(CreateTagInput {
                name: "Systems".to_string(),
                slug: None,
            })
            .await
            .unwrap();
        let leaf = fx
            .tags
            .create(CreateTagInput {
                name: "Rust".to_string(),
                slug: None,
            })
            .await
            .unwrap();
        fx.tags.add_relation(root.id, mid.id).await.unwrap();
        fx.tags.add_relation(mid.id, leaf.id).await.unwrap();

        let article = fx
            .articles
            .create(&author, draft("Tagged", vec![leaf.id]))
            .await
            .unwrap();

        let remaining = fx
            .articles
            .detach_tags(&author, article.id, &[mid.id])
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, root.id);
    }

    #[tokio::test]
    async fn test_popular_limit_is_clamped() {
        let fx = setup().await;
        // Should not error even with a zero limit request
        assert!(fx.articles.popular(0).await.unwrap().is_empty());
    }
}
