//! Favorite repository
//!
//! Database operations for the favorite-articles ledger. One row per
//! (user, article) pair; the unique index makes double-favoriting a
//! detectable conflict rather than a silent duplicate.

use crate::config::DatabaseDriver;
use crate::db::DbHandle;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

/// Favorite repository trait
#[async_trait]
pub trait FavoriteRepository: Send + Sync {
    /// Record a favorite. Returns false if the pair already exists.
    async fn add(&self, user_id: i64, article_id: i64) -> Result<bool>;

    /// Remove a favorite. Returns false if the pair did not exist.
    async fn remove(&self, user_id: i64, article_id: i64) -> Result<bool>;

    /// Check whether a user has favorited an article
    async fn exists(&self, user_id: i64, article_id: i64) -> Result<bool>;

    /// IDs of articles a user has favorited, most recent first
    async fn article_ids_for_user(&self, user_id: i64) -> Result<Vec<i64>>;

    /// Number of users who favorited an article
    async fn count_for_article(&self, article_id: i64) -> Result<i64>;
}

/// SQLx-based favorite repository implementation
pub struct SqlxFavoriteRepository {
    pool: DbHandle,
}

impl SqlxFavoriteRepository {
    /// Create a new SQLx favorite repository
    pub fn new(pool: DbHandle) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DbHandle) -> Arc<dyn FavoriteRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl FavoriteRepository for SqlxFavoriteRepository {
    async fn add(&self, user_id: i64, article_id: i64) -> Result<bool> {
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(
                    "INSERT OR IGNORE INTO favorite_articles (user_id, article_id) VALUES (?, ?)",
                )
                .bind(user_id)
                .bind(article_id)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to add favorite")?
                .rows_affected()
            }
            DatabaseDriver::Mysql => {
                sqlx::query(
                    "INSERT IGNORE INTO favorite_articles (user_id, article_id) VALUES (?, ?)",
                )
                .bind(user_id)
                .bind(article_id)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to add favorite")?
                .rows_affected()
            }
        };
        Ok(affected > 0)
    }

    async fn remove(&self, user_id: i64, article_id: i64) -> Result<bool> {
        let sql = "DELETE FROM favorite_articles WHERE user_id = ? AND article_id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(user_id)
                .bind(article_id)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to remove favorite")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(user_id)
                .bind(article_id)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to remove favorite")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn exists(&self, user_id: i64, article_id: i64) -> Result<bool> {
        let sql =
            "SELECT COUNT(*) as total FROM favorite_articles WHERE user_id = ? AND article_id = ?";
        let total: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(user_id)
                .bind(article_id)
                .fetch_one(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to check favorite")?
                .get("total"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(user_id)
                .bind(article_id)
                .fetch_one(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to check favorite")?
                .get("total"),
        };
        Ok(total > 0)
    }

    async fn article_ids_for_user(&self, user_id: i64) -> Result<Vec<i64>> {
        let sql = "SELECT article_id FROM favorite_articles WHERE user_id = ? ORDER BY created_at DESC, id DESC";
        let rows = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(user_id)
                .fetch_all(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to list favorites")?
                .iter()
                .map(|r| r.get("article_id"))
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(user_id)
                .fetch_all(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to list favorites")?
                .iter()
                .map(|r| r.get("article_id"))
                .collect(),
        };
        Ok(rows)
    }

    async fn count_for_article(&self, article_id: i64) -> Result<i64> {
        let sql = "SELECT COUNT(*) as total FROM favorite_articles WHERE article_id = ?";
        let total = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(article_id)
                .fetch_one(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to count favorites")?
                .get("total"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(article_id)
                .fetch_one(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to count favorites")?
                .get("total"),
        };
        Ok(total)
    }
}
