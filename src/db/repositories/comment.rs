//! Comment repository
//!
//! Database operations for article comments.

use crate::config::DatabaseDriver;
use crate::db::DbHandle;
use crate::models::Comment;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a new comment
    async fn create(&self, comment: &Comment) -> Result<Comment>;

    /// Get comment by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// List comments for an article, oldest first
    async fn list_by_article(&self, article_id: i64) -> Result<Vec<Comment>>;

    /// Update comment text
    async fn update_text(&self, id: i64, text: &str) -> Result<()>;

    /// Delete a comment
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based comment repository implementation
pub struct SqlxCommentRepository {
    pool: DbHandle,
}

impl SqlxCommentRepository {
    /// Create a new SQLx comment repository
    pub fn new(pool: DbHandle) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DbHandle) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, comment: &Comment) -> Result<Comment> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_comment_sqlite(self.pool.as_sqlite().unwrap(), comment).await
            }
            DatabaseDriver::Mysql => {
                create_comment_mysql(self.pool.as_mysql().unwrap(), comment).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let sql = "SELECT id, article_id, author_id, text, created_at, updated_at \
                   FROM comments WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get comment")?;
                Ok(row.map(|r| row_to_comment_sqlite(&r)))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get comment")?;
                Ok(row.map(|r| row_to_comment_mysql(&r)))
            }
        }
    }

    async fn list_by_article(&self, article_id: i64) -> Result<Vec<Comment>> {
        let sql = "SELECT id, article_id, author_id, text, created_at, updated_at \
                   FROM comments WHERE article_id = ? ORDER BY created_at ASC, id ASC";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(sql)
                    .bind(article_id)
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to list comments")?;
                Ok(rows.iter().map(row_to_comment_sqlite).collect())
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(sql)
                    .bind(article_id)
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to list comments")?;
                Ok(rows.iter().map(row_to_comment_mysql).collect())
            }
        }
    }

    async fn update_text(&self, id: i64, text: &str) -> Result<()> {
        let sql = "UPDATE comments SET text = ?, updated_at = ? WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(text)
                    .bind(Utc::now())
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to update comment")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(text)
                    .bind(Utc::now())
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to update comment")?;
            }
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let sql = "DELETE FROM comments WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to delete comment")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to delete comment")?;
            }
        }
        Ok(())
    }
}

async fn create_comment_sqlite(pool: &SqlitePool, comment: &Comment) -> Result<Comment> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO comments (article_id, author_id, text, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(comment.article_id)
    .bind(comment.author_id)
    .bind(&comment.text)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..comment.clone()
    })
}

async fn create_comment_mysql(pool: &MySqlPool, comment: &Comment) -> Result<Comment> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO comments (article_id, author_id, text, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(comment.article_id)
    .bind(comment.author_id)
    .bind(&comment.text)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        ..comment.clone()
    })
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        article_id: row.get("article_id"),
        author_id: row.get("author_id"),
        text: row.get("text"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_comment_mysql(row: &sqlx::mysql::MySqlRow) -> Comment {
    Comment {
        id: row.get("id"),
        article_id: row.get("article_id"),
        author_id: row.get("author_id"),
        text: row.get("text"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        ArticleRepository, SqlxArticleRepository, SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Article, User, UserRole};

    async fn setup() -> (Arc<dyn CommentRepository>, i64, i64) {
        let pool = create_test_pool().await.expect("Failed to create pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::boxed(pool.clone());
        let user = users
            .create(&User {
                id: 0,
                email: "commenter@example.com".to_string(),
                first_name: "C".to_string(),
                last_name: "Ommenter".to_string(),
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
            .create(&Article {
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

        (SqlxCommentRepository::boxed(pool), user.id, article.id)
    }

    fn sample_comment(article_id: i64, author_id: i64, text: &str) -> Comment {
        Comment {
            id: 0,
            article_id,
            author_id,
            text: text.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_list_order() {
        let (repo, user_id, article_id) = setup().await;

        repo.create(&sample_comment(article_id, user_id, "first"))
            .await
            .unwrap();
        repo.create(&sample_comment(article_id, user_id, "second"))
            .await
            .unwrap();

        let comments = repo.list_by_article(article_id).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].text, "first");
        assert_eq!(comments[1].text, "second");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (repo, user_id, article_id) = setup().await;

        let comment = repo
            .create(&sample_comment(article_id, user_id, "typo"))
            .await
            .unwrap();

        repo.update_text(comment.id, "fixed").await.unwrap();
        let fetched = repo.get_by_id(comment.id).await.unwrap().unwrap();
        assert_eq!(fetched.text, "fixed");

        repo.delete(comment.id).await.unwrap();
        assert!(repo.get_by_id(comment.id).await.unwrap().is_none());
    }
}
