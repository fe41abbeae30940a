//! Article repository
//!
//! Database operations for articles.
//!
//! This module provides:
//! - `ArticleRepository` trait defining the interface for article data access
//! - `SqlxArticleRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DbHandle;
use crate::models::{Article, ListParams, PagedResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Article repository trait
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Create a new article
    async fn create(&self, article: &Article) -> Result<Article>;

    /// Get article by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Article>>;

    /// Get several articles by ID, ordered by creation time descending
    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Article>>;

    /// List published articles, newest first
    async fn list_published(&self, params: &ListParams) -> Result<PagedResult<Article>>;

    /// List articles by author, newest first (includes drafts)
    async fn list_by_author(&self, author_id: i64, params: &ListParams)
        -> Result<PagedResult<Article>>;

    /// List the most viewed published articles
    async fn list_popular(&self, limit: usize) -> Result<Vec<Article>>;

    /// Update mutable article fields
    async fn update(&self, article: &Article) -> Result<()>;

    /// Delete an article
    async fn delete(&self, id: i64) -> Result<()>;

    /// Increment the view counter
    async fn increment_views(&self, id: i64) -> Result<()>;

    /// Count articles authored by a user
    async fn count_by_author(&self, author_id: i64) -> Result<i64>;
}

/// SQLx-based article repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxArticleRepository {
    pool: DbHandle,
}

impl SqlxArticleRepository {
    /// Create a new SQLx article repository
    pub fn new(pool: DbHandle) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DbHandle) -> Arc<dyn ArticleRepository> {
        Arc::new(Self::new(pool))
    }
}

const ARTICLE_COLUMNS: &str = "id, title, text, source_name, source_link, is_published, \
     views_count, reading_time, author_id, created_at, updated_at";

#[async_trait]
impl ArticleRepository for SqlxArticleRepository {
    async fn create(&self, article: &Article) -> Result<Article> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_article_sqlite(self.pool.as_sqlite().unwrap(), article).await
            }
            DatabaseDriver::Mysql => {
                create_article_mysql(self.pool.as_mysql().unwrap(), article).await
            }
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Article>> {
        let sql = format!("SELECT {} FROM articles WHERE id = ?", ARTICLE_COLUMNS);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get article by ID")?;
                row.map(|r| row_to_article_sqlite(&r)).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get article by ID")?;
                row.map(|r| row_to_article_mysql(&r)).transpose()
            }
        }
    }

    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Article>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM articles WHERE id IN ({}) ORDER BY created_at DESC",
            ARTICLE_COLUMNS, placeholders
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut query = sqlx::query(&sql);
                for id in ids {
                    query = query.bind(id);
                }
                let rows = query
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get articles by IDs")?;
                rows.iter().map(row_to_article_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let mut query = sqlx::query(&sql);
                for id in ids {
                    query = query.bind(id);
                }
                let rows = query
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get articles by IDs")?;
                rows.iter().map(row_to_article_mysql).collect()
            }
        }
    }

    async fn list_published(&self, params: &ListParams) -> Result<PagedResult<Article>> {
        let sql = format!(
            "SELECT {} FROM articles WHERE is_published = ? \
             ORDER BY created_at DESC LIMIT ? OFFSET ?",
            ARTICLE_COLUMNS
        );
        let count_sql = "SELECT COUNT(*) as total FROM articles WHERE is_published = ?";

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let pool = self.pool.as_sqlite().unwrap();
                let rows = sqlx::query(&sql)
                    .bind(true)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list articles")?;
                let items: Result<Vec<Article>> =
                    rows.iter().map(row_to_article_sqlite).collect();
                let total: i64 = sqlx::query(count_sql)
                    .bind(true)
                    .fetch_one(pool)
                    .await
                    .context("Failed to count articles")?
                    .get("total");
                Ok(PagedResult::new(items?, total, params))
            }
            DatabaseDriver::Mysql => {
                let pool = self.pool.as_mysql().unwrap();
                let rows = sqlx::query(&sql)
                    .bind(true)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list articles")?;
                let items: Result<Vec<Article>> =
                    rows.iter().map(row_to_article_mysql).collect();
                let total: i64 = sqlx::query(count_sql)
                    .bind(true)
                    .fetch_one(pool)
                    .await
                    .context("Failed to count articles")?
                    .get("total");
                Ok(PagedResult::new(items?, total, params))
            }
        }
    }

    async fn list_by_author(
        &self,
        author_id: i64,
        params: &ListParams,
    ) -> Result<PagedResult<Article>> {
        let sql = format!(
            "SELECT {} FROM articles WHERE author_id = ? \
             ORDER BY created_at DESC LIMIT ? OFFSET ?",
            ARTICLE_COLUMNS
        );
        let count_sql = "SELECT COUNT(*) as total FROM articles WHERE author_id = ?";

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let pool = self.pool.as_sqlite().unwrap();
                let rows = sqlx::query(&sql)
                    .bind(author_id)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list author articles")?;
                let items: Result<Vec<Article>> =
                    rows.iter().map(row_to_article_sqlite).collect();
                let total: i64 = sqlx::query(count_sql)
                    .bind(author_id)
                    .fetch_one(pool)
                    .await
                    .context("Failed to count author articles")?
                    .get("total");
                Ok(PagedResult::new(items?, total, params))
            }
            DatabaseDriver::Mysql => {
                let pool = self.pool.as_mysql().unwrap();
                let rows = sqlx::query(&sql)
                    .bind(author_id)
                    .bind(params.limit())
                    .bind(params.offset())
                    .fetch_all(pool)
                    .await
                    .context("Failed to list author articles")?;
                let items: Result<Vec<Article>> =
                    rows.iter().map(row_to_article_mysql).collect();
                let total: i64 = sqlx::query(count_sql)
                    .bind(author_id)
                    .fetch_one(pool)
                    .await
                    .context("Failed to count author articles")?
                    .get("total");
                Ok(PagedResult::new(items?, total, params))
            }
        }
    }

    async fn list_popular(&self, limit: usize) -> Result<Vec<Article>> {
        let sql = format!(
            "SELECT {} FROM articles WHERE is_published = ? \
             ORDER BY views_count DESC, created_at DESC LIMIT ?",
            ARTICLE_COLUMNS
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(&sql)
                    .bind(true)
                    .bind(limit as i64)
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to list popular articles")?;
                rows.iter().map(row_to_article_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(&sql)
                    .bind(true)
                    .bind(limit as i64)
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to list popular articles")?;
                rows.iter().map(row_to_article_mysql).collect()
            }
        }
    }

    async fn update(&self, article: &Article) -> Result<()> {
        let sql = r#"
            UPDATE articles
            SET title = ?, text = ?, source_name = ?, source_link = ?,
                is_published = ?, reading_time = ?, updated_at = ?
            WHERE id = ?
        "#;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(&article.title)
                    .bind(&article.text)
                    .bind(&article.source_name)
                    .bind(&article.source_link)
                    .bind(article.is_published)
                    .bind(article.reading_time)
                    .bind(Utc::now())
                    .bind(article.id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to update article")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(&article.title)
                    .bind(&article.text)
                    .bind(&article.source_name)
                    .bind(&article.source_link)
                    .bind(article.is_published)
                    .bind(article.reading_time)
                    .bind(Utc::now())
                    .bind(article.id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to update article")?;
            }
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let sql = "DELETE FROM articles WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to delete article")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to delete article")?;
            }
        }
        Ok(())
    }

    async fn increment_views(&self, id: i64) -> Result<()> {
        // Single atomic statement, no read-modify-write race
        let sql = "UPDATE articles SET views_count = views_count + 1 WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to increment views")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to increment views")?;
            }
        }
        Ok(())
    }

    async fn count_by_author(&self, author_id: i64) -> Result<i64> {
        let sql = "SELECT COUNT(*) as total FROM articles WHERE author_id = ?";
        let total = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(author_id)
                .fetch_one(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to count author articles")?
                .get("total"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(author_id)
                .fetch_one(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to count author articles")?
                .get("total"),
        };
        Ok(total)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_article_sqlite(pool: &SqlitePool, article: &Article) -> Result<Article> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO articles
            (title, text, source_name, source_link, is_published, views_count,
             reading_time, author_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?, ?)
        "#,
    )
    .bind(&article.title)
    .bind(&article.text)
    .bind(&article.source_name)
    .bind(&article.source_link)
    .bind(article.is_published)
    .bind(article.reading_time)
    .bind(article.author_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create article")?;

    Ok(Article {
        id: result.last_insert_rowid(),
        views_count: 0,
        created_at: now,
        updated_at: now,
        ..article.clone()
    })
}

fn row_to_article_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Article> {
    Ok(Article {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        source_name: row.get("source_name"),
        source_link: row.get("source_link"),
        is_published: row.get("is_published"),
        views_count: row.get("views_count"),
        reading_time: row.get("reading_time"),
        author_id: row.get("author_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_article_mysql(pool: &MySqlPool, article: &Article) -> Result<Article> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO articles
            (title, text, source_name, source_link, is_published, views_count,
             reading_time, author_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?, ?)
        "#,
    )
    .bind(&article.title)
    .bind(&article.text)
    .bind(&article.source_name)
    .bind(&article.source_link)
    .bind(article.is_published)
    .bind(article.reading_time)
    .bind(article.author_id)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create article")?;

    Ok(Article {
        id: result.last_insert_id() as i64,
        views_count: 0,
        created_at: now,
        updated_at: now,
        ..article.clone()
    })
}

fn row_to_article_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Article> {
    Ok(Article {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        source_name: row.get("source_name"),
        source_link: row.get("source_link"),
        is_published: row.get("is_published"),
        views_count: row.get("views_count"),
        reading_time: row.get("reading_time"),
        author_id: row.get("author_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{User, UserRole};

    async fn setup() -> (Arc<dyn ArticleRepository>, i64) {
        let pool = create_test_pool().await.expect("Failed to create pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::boxed(pool.clone());
        let user = users
            .create(&User {
                id: 0,
                email: "author@example.com".to_string(),
                first_name: "A".to_string(),
                last_name: "B".to_string(),
                password_hash: "hash".to_string(),
                role: UserRole::User,
                subscribed: false,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await
            .expect("Failed to create user");

        (SqlxArticleRepository::boxed(pool), user.id)
    }

    fn sample_article(author_id: i64, title: &str, published: bool) -> Article {
        Article {
            id: 0,
            title: title.to_string(),
            text: "Some body text".to_string(),
            source_name: None,
            source_link: None,
            is_published: published,
            views_count: 0,
            reading_time: 1,
            author_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (repo, author_id) = setup().await;

        let created = repo
            .create(&sample_article(author_id, "Hello", true))
            .await
            .expect("Failed to create article");
        assert!(created.id > 0);

        let fetched = repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Hello");
        assert_eq!(fetched.views_count, 0);
    }

    #[tokio::test]
    async fn test_list_published_excludes_drafts() {
        let (repo, author_id) = setup().await;

        repo.create(&sample_article(author_id, "Pub", true)).await.unwrap();
        repo.create(&sample_article(author_id, "Draft", false)).await.unwrap();

        let page = repo.list_published(&ListParams::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].title, "Pub");

        let by_author = repo
            .list_by_author(author_id, &ListParams::default())
            .await
            .unwrap();
        assert_eq!(by_author.total, 2);
    }

    #[tokio::test]
    async fn test_increment_views_and_popularity() {
        let (repo, author_id) = setup().await;

        let quiet = repo.create(&sample_article(author_id, "Quiet", true)).await.unwrap();
        let busy = repo.create(&sample_article(author_id, "Busy", true)).await.unwrap();

        for _ in 0..3 {
            repo.increment_views(busy.id).await.unwrap();
        }
        repo.increment_views(quiet.id).await.unwrap();

        let popular = repo.list_popular(10).await.unwrap();
        assert_eq!(popular[0].id, busy.id);
        assert_eq!(popular[0].views_count, 3);
        assert_eq!(popular[1].views_count, 1);
    }

    #[tokio::test]
    async fn test_update() {
        let (repo, author_id) = setup().await;

        let mut article = repo
            .create(&sample_article(author_id, "Before", false))
            .await
            .unwrap();
        article.title = "After".to_string();
        article.is_published = true;
        repo.update(&article).await.unwrap();

        let fetched = repo.get_by_id(article.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "After");
        assert!(fetched.is_published);
    }

    #[tokio::test]
    async fn test_delete_and_count() {
        let (repo, author_id) = setup().await;

        let article = repo
            .create(&sample_article(author_id, "Gone", true))
            .await
            .unwrap();
        assert_eq!(repo.count_by_author(author_id).await.unwrap(), 1);

        repo.delete(article.id).await.unwrap();
        assert!(repo.get_by_id(article.id).await.unwrap().is_none());
        assert_eq!(repo.count_by_author(author_id).await.unwrap(), 0);
    }
}
