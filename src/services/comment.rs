//! Comment service
//!
//! Business logic for article comments.

use crate::db::repositories::{ArticleRepository, CommentRepository};
use crate::models::{Comment, CreateCommentInput, User};
use anyhow::Context;
use std::sync::Arc;

/// Error types for comment service operations
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    /// Article not found
    #[error("Article not found")]
    ArticleNotFound,

    /// Comment not found
    #[error("Comment not found")]
    NotFound,

    /// Actor is not allowed to modify the comment
    #[error("Not allowed to modify this comment")]
    NotPermitted,

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Comment service
pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    articles: Arc<dyn ArticleRepository>,
}

impl CommentService {
    /// Create a new comment service
    pub fn new(comments: Arc<dyn CommentRepository>, articles: Arc<dyn ArticleRepository>) -> Self {
        Self { comments, articles }
    }

    /// Post a comment on an article
    pub async fn create(
        &self,
        author: &User,
        article_id: i64,
        input: CreateCommentInput,
    ) -> Result<Comment, CommentServiceError> {
        let text = input.text.trim().to_string();
        if text.is_empty() {
            return Err(CommentServiceError::ValidationError(
                "Comment text cannot be empty".to_string(),
            ));
        }

        if self
            .articles
            .get_by_id(article_id)
            .await
            .context("Failed to load article")?
            .is_none()
        {
            return Err(CommentServiceError::ArticleNotFound);
        }

        let now = chrono::Utc::now();
        let comment = Comment {
            id: 0,
            article_id,
            author_id: author.id,
            text,
            created_at: now,
            updated_at: now,
        };

        self.comments
            .create(&comment)
            .await
            .context("Failed to create comment")
            .map_err(Into::into)
    }

    /// List comments on an article, oldest first
    pub async fn list(&self, article_id: i64) -> Result<Vec<Comment>, CommentServiceError> {
        if self
            .articles
            .get_by_id(article_id)
            .await
            .context("Failed to load article")?
            .is_none()
        {
            return Err(CommentServiceError::ArticleNotFound);
        }

        self.comments
            .list_by_article(article_id)
            .await
            .context("Failed to list comments")
            .map_err(Into::into)
    }

    /// Edit a comment. Only the author or a moderator may edit.
    pub async fn update(
        &self,
        actor: &User,
        comment_id: i64,
        text: &str,
    ) -> Result<Comment, CommentServiceError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CommentServiceError::ValidationError(
                "Comment text cannot be empty".to_string(),
            ));
        }

        self.authorize(actor, comment_id).await?;
        self.comments
            .update_text(comment_id, text)
            .await
            .context("Failed to update comment")?;

        self.comments
            .get_by_id(comment_id)
            .await
            .context("Failed to reload comment")?
            .ok_or(CommentServiceError::NotFound)
    }

    /// Delete a comment. Only the author or a moderator may delete.
    pub async fn delete(&self, actor: &User, comment_id: i64) -> Result<(), CommentServiceError> {
        self.authorize(actor, comment_id).await?;
        self.comments
            .delete(comment_id)
            .await
            .context("Failed to delete comment")
            .map_err(Into::into)
    }

    async fn authorize(&self, actor: &User, comment_id: i64) -> Result<Comment, CommentServiceError> {
        let comment = self
            .comments
            .get_by_id(comment_id)
            .await
            .context("Failed to load comment")?
            .ok_or(CommentServiceError::NotFound)?;

        if comment.author_id != actor.id && !actor.is_moderator() {
            return Err(CommentServiceError::NotPermitted);
        }
        Ok(comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxArticleRepository, SqlxCommentRepository, SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Article, UserRole};
    use chrono::Utc;

    struct Fixture {
        service: CommentService,
        users: Arc<dyn UserRepository>,
        article_id: i64,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::boxed(pool.clone());
        let author = make_user_on(&users, "author@example.com", UserRole::User).await;

        let articles = SqlxArticleRepository::boxed(pool.clone());
        let article = articles
            .create(&Article {
                id: 0,
                title: "T".to_string(),
                text: "body".to_string(),
                source_name: None,
                source_link: None,
                is_published: true,
                views_count: 0,
                reading_time: 1,
                author_id: author.id,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await
            .expect("Failed to create article");

        Fixture {
            service: CommentService::new(SqlxCommentRepository::boxed(pool.clone()), articles),
            users,
            article_id: article.id,
        }
    }

    async fn make_user_on(users: &Arc<dyn UserRepository>, email: &str, role: UserRole) -> User {
        users
            .create(&User {
                id: 0,
                email: email.to_string(),
                first_name: "U".to_string(),
                last_name: "Ser".to_string(),
                password_hash: "hash".to_string(),
                role,
                subscribed: false,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await
            .expect("Failed to create user")
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let fx = setup().await;
        let commenter = make_user_on(&fx.users, "c@example.com", UserRole::User).await;

        fx.service
            .create(
                &commenter,
                fx.article_id,
                CreateCommentInput {
                    text: "  nice article  ".to_string(),
                },
            )
            .await
            .unwrap();

        let comments = fx.service.list(fx.article_id).await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].text, "nice article");
    }

    #[tokio::test]
    async fn test_create_on_missing_article() {
        let fx = setup().await;
        let commenter = make_user_on(&fx.users, "c@example.com", UserRole::User).await;

        let err = fx
            .service
            .create(
                &commenter,
                9999,
                CreateCommentInput {
                    text: "hello".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CommentServiceError::ArticleNotFound));
    }

    #[tokio::test]
    async fn test_update_requires_ownership() {
        let fx = setup().await;
        let commenter = make_user_on(&fx.users, "c@example.com", UserRole::User).await;
        let stranger = make_user_on(&fx.users, "s@example.com", UserRole::User).await;
        let moderator = make_user_on(&fx.users, "m@example.com", UserRole::Moderator).await;

        let comment = fx
            .service
            .create(
                &commenter,
                fx.article_id,
                CreateCommentInput {
                    text: "original".to_string(),
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            fx.service
                .update(&stranger, comment.id, "hijacked")
                .await
                .unwrap_err(),
            CommentServiceError::NotPermitted
        ));

        let edited = fx.service.update(&moderator, comment.id, "cleaned").await.unwrap();
        assert_eq!(edited.text, "cleaned");

        fx.service.delete(&commenter, comment.id).await.unwrap();
        assert!(fx.service.list(fx.article_id).await.unwrap().is_empty());
    }
}
