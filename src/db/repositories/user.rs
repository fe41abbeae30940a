//! User repository
//!
//! Database operations for user accounts.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DbHandle;
use crate::models::{User, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Update profile fields (first name, last name, password hash)
    async fn update_profile(
        &self,
        id: i64,
        first_name: &str,
        last_name: &str,
        password_hash: &str,
    ) -> Result<()>;

    /// Set the subscription flag. Returns false if the flag already had
    /// the requested value.
    async fn set_subscribed(&self, id: i64, subscribed: bool) -> Result<bool>;

    /// Set the user role
    async fn set_role(&self, id: i64, role: UserRole) -> Result<()>;

    /// Delete a user
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DbHandle,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DbHandle) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DbHandle) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_user_sqlite(self.pool.as_sqlite().unwrap(), user).await,
            DatabaseDriver::Mysql => create_user_mysql(self.pool.as_mysql().unwrap(), user).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_id_sqlite(self.pool.as_sqlite().unwrap(), id).await
            }
            DatabaseDriver::Mysql => get_user_by_id_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_email_sqlite(self.pool.as_sqlite().unwrap(), email).await
            }
            DatabaseDriver::Mysql => {
                get_user_by_email_mysql(self.pool.as_mysql().unwrap(), email).await
            }
        }
    }

    async fn update_profile(
        &self,
        id: i64,
        first_name: &str,
        last_name: &str,
        password_hash: &str,
    ) -> Result<()> {
        let sql = r#"
            UPDATE users
            SET first_name = ?, last_name = ?, password_hash = ?, updated_at = ?
            WHERE id = ?
        "#;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(first_name)
                    .bind(last_name)
                    .bind(password_hash)
                    .bind(Utc::now())
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to update user profile")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(first_name)
                    .bind(last_name)
                    .bind(password_hash)
                    .bind(Utc::now())
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to update user profile")?;
            }
        }
        Ok(())
    }

    async fn set_subscribed(&self, id: i64, subscribed: bool) -> Result<bool> {
        // The WHERE clause skips the write when the flag already matches,
        // which the caller reports as a conflict.
        let sql = "UPDATE users SET subscribed = ?, updated_at = ? WHERE id = ? AND subscribed <> ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(subscribed)
                .bind(Utc::now())
                .bind(id)
                .bind(subscribed)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to set subscription flag")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(subscribed)
                .bind(Utc::now())
                .bind(id)
                .bind(subscribed)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to set subscription flag")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn set_role(&self, id: i64, role: UserRole) -> Result<()> {
        let sql = "UPDATE users SET role = ?, updated_at = ? WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(role.as_str())
                    .bind(Utc::now())
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to set user role")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(role.as_str())
                    .bind(Utc::now())
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to set user role")?;
            }
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let sql = "DELETE FROM users WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to delete user")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to delete user")?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, user: &User) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (email, first_name, last_name, password_hash, role, subscribed, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.password_hash)
    .bind(user.role.as_str())
    .bind(user.subscribed)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_rowid(),
        created_at: now,
        updated_at: now,
        ..user.clone()
    })
}

async fn get_user_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, email, first_name, last_name, password_hash, role, subscribed, created_at, updated_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_user_sqlite(&row)?)),
        None => Ok(None),
    }
}

async fn get_user_by_email_sqlite(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, email, first_name, last_name, password_hash, role, subscribed, created_at, updated_at
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by email")?;

    match row {
        Some(row) => Ok(Some(row_to_user_sqlite(&row)?)),
        None => Ok(None),
    }
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role: String = row.get("role");
    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        password_hash: row.get("password_hash"),
        role: UserRole::from_str(&role)
            .with_context(|| format!("Unknown user role in database: {}", role))?,
        subscribed: row.get("subscribed"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, user: &User) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (email, first_name, last_name, password_hash, role, subscribed, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.password_hash)
    .bind(user.role.as_str())
    .bind(user.subscribed)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_id() as i64,
        created_at: now,
        updated_at: now,
        ..user.clone()
    })
}

async fn get_user_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, email, first_name, last_name, password_hash, role, subscribed, created_at, updated_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by ID")?;

    match row {
        Some(row) => Ok(Some(row_to_user_mysql(&row)?)),
        None => Ok(None),
    }
}

async fn get_user_by_email_mysql(pool: &MySqlPool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, email, first_name, last_name, password_hash, role, subscribed, created_at, updated_at
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await
    .context("Failed to get user by email")?;

    match row {
        Some(row) => Ok(Some(row_to_user_mysql(&row)?)),
        None => Ok(None),
    }
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    let role: String = row.get("role");
    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        password_hash: row.get("password_hash"),
        role: UserRole::from_str(&role)
            .with_context(|| format!("Unknown user role in database: {}", role))?,
        subscribed: row.get("subscribed"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> Arc<dyn UserRepository> {
        let pool = create_test_pool().await.expect("Failed to create pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxUserRepository::boxed(pool)
    }

    fn sample_user(email: &str) -> User {
        User {
            id: 0,
            email: email.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            password_hash: "hash".to_string(),
            role: UserRole::User,
            subscribed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let repo = setup().await;

        let created = repo
            .create(&sample_user("ada@example.com"))
            .await
            .expect("Failed to create user");
        assert!(created.id > 0);

        let fetched = repo
            .get_by_id(created.id)
            .await
            .expect("Failed to get user")
            .expect("User should exist");
        assert_eq!(fetched.email, "ada@example.com");
        assert_eq!(fetched.role, UserRole::User);

        let by_email = repo
            .get_by_email("ada@example.com")
            .await
            .expect("Failed to get user")
            .expect("User should exist");
        assert_eq!(by_email.id, created.id);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let repo = setup().await;

        repo.create(&sample_user("dup@example.com"))
            .await
            .expect("Failed to create user");
        let result = repo.create(&sample_user("dup@example.com")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_set_subscribed_detects_same_state() {
        let repo = setup().await;
        let user = repo
            .create(&sample_user("sub@example.com"))
            .await
            .expect("Failed to create user");

        assert!(repo.set_subscribed(user.id, true).await.unwrap());
        // Same state again is reported as a no-op
        assert!(!repo.set_subscribed(user.id, true).await.unwrap());
        assert!(repo.set_subscribed(user.id, false).await.unwrap());
        assert!(!repo.set_subscribed(user.id, false).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_profile_and_role() {
        let repo = setup().await;
        let user = repo
            .create(&sample_user("edit@example.com"))
            .await
            .expect("Failed to create user");

        repo.update_profile(user.id, "Grace", "Hopper", "newhash")
            .await
            .expect("Failed to update profile");
        repo.set_role(user.id, UserRole::Moderator)
            .await
            .expect("Failed to set role");

        let fetched = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(fetched.first_name, "Grace");
        assert_eq!(fetched.last_name, "Hopper");
        assert_eq!(fetched.password_hash, "newhash");
        assert_eq!(fetched.role, UserRole::Moderator);
    }

    #[tokio::test]
    async fn test_delete_user() {
        let repo = setup().await;
        let user = repo
            .create(&sample_user("gone@example.com"))
            .await
            .expect("Failed to create user");

        repo.delete(user.id).await.expect("Failed to delete user");
        assert!(repo.get_by_id(user.id).await.unwrap().is_none());
    }
}
