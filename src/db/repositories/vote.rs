//! Vote repository
//!
//! Database operations for the polymorphic vote ledger.
//!
//! Casting a vote is a single upsert keyed on (user, target), so repeated or
//! concurrent casts collapse into one row holding the latest value. Ratings
//! and counts are aggregated from the ledger at read time.

use crate::config::DatabaseDriver;
use crate::db::DbHandle;
use crate::models::{Vote, VoteTarget, VoteValue};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::Row;
use std::sync::Arc;

/// Like and dislike counts for one target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteCounts {
    /// Number of positive votes
    pub likes: i64,
    /// Number of negative votes
    pub dislikes: i64,
}

impl VoteCounts {
    /// Net rating (likes minus dislikes)
    pub fn rating(&self) -> i64 {
        self.likes - self.dislikes
    }
}

/// Vote repository trait
#[async_trait]
pub trait VoteRepository: Send + Sync {
    /// Cast or change a vote. Overwrites any previous vote by the same user
    /// on the same target and returns the row as stored.
    async fn cast(&self, user_id: i64, target: VoteTarget, value: VoteValue) -> Result<Vote>;

    /// Retract a vote. Returns false if no vote existed.
    async fn retract(&self, user_id: i64, target: VoteTarget) -> Result<bool>;

    /// Get a user's current vote on a target
    async fn get(&self, user_id: i64, target: VoteTarget) -> Result<Option<VoteValue>>;

    /// Like and dislike counts for a target
    async fn counts(&self, target: VoteTarget) -> Result<VoteCounts>;

    /// Net rating for a target (sum of vote values)
    async fn rating(&self, target: VoteTarget) -> Result<i64>;

    /// Net rating of a user: the sum of all votes cast on articles the user
    /// authored
    async fn author_rating(&self, author_id: i64) -> Result<i64>;

    /// IDs of the users who cast the given vote value on a target
    async fn voters_for(&self, target: VoteTarget, value: VoteValue) -> Result<Vec<i64>>;
}

/// SQLx-based vote repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxVoteRepository {
    pool: DbHandle,
}

impl SqlxVoteRepository {
    /// Create a new SQLx vote repository
    pub fn new(pool: DbHandle) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DbHandle) -> Arc<dyn VoteRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl VoteRepository for SqlxVoteRepository {
    async fn cast(&self, user_id: i64, target: VoteTarget, value: VoteValue) -> Result<Vote> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(
                    r#"
                    INSERT INTO votes (user_id, target_type, target_id, vote)
                    VALUES (?, ?, ?, ?)
                    ON CONFLICT(user_id, target_type, target_id)
                    DO UPDATE SET vote = excluded.vote
                    "#,
                )
                .bind(user_id)
                .bind(target.kind())
                .bind(target.id())
                .bind(value.as_i32())
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to cast vote")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(
                    r#"
                    INSERT INTO votes (user_id, target_type, target_id, vote)
                    VALUES (?, ?, ?, ?)
                    ON DUPLICATE KEY UPDATE vote = VALUES(vote)
                    "#,
                )
                .bind(user_id)
                .bind(target.kind())
                .bind(target.id())
                .bind(value.as_i32())
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to cast vote")?;
            }
        }

        // The upsert collapses into one row keyed on (user, target); read it
        // back so callers see the stored id and timestamp.
        let sql = r#"
            SELECT id, vote, created_at FROM votes
            WHERE user_id = ? AND target_type = ? AND target_id = ?
        "#;
        let (id, vote, created_at): (i64, i32, NaiveDateTime) = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let r = sqlx::query(sql)
                    .bind(user_id)
                    .bind(target.kind())
                    .bind(target.id())
                    .fetch_one(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to read back vote")?;
                (r.get("id"), r.get("vote"), r.get("created_at"))
            }
            DatabaseDriver::Mysql => {
                let r = sqlx::query(sql)
                    .bind(user_id)
                    .bind(target.kind())
                    .bind(target.id())
                    .fetch_one(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to read back vote")?;
                (r.get("id"), r.get("vote"), r.get("created_at"))
            }
        };

        Ok(Vote {
            id,
            user_id,
            target,
            vote: VoteValue::from_i32(vote)
                .with_context(|| format!("Corrupt vote value in ledger: {}", vote))?,
            created_at: DateTime::<Utc>::from_naive_utc_and_offset(created_at, Utc),
        })
    }

    async fn retract(&self, user_id: i64, target: VoteTarget) -> Result<bool> {
        let sql = "DELETE FROM votes WHERE user_id = ? AND target_type = ? AND target_id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(user_id)
                .bind(target.kind())
                .bind(target.id())
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to retract vote")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(user_id)
                .bind(target.kind())
                .bind(target.id())
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to retract vote")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn get(&self, user_id: i64, target: VoteTarget) -> Result<Option<VoteValue>> {
        let sql = "SELECT vote FROM votes WHERE user_id = ? AND target_type = ? AND target_id = ?";
        let vote: Option<i32> = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(user_id)
                .bind(target.kind())
                .bind(target.id())
                .fetch_optional(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to get vote")?
                .map(|r| r.get("vote")),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(user_id)
                .bind(target.kind())
                .bind(target.id())
                .fetch_optional(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to get vote")?
                .map(|r| r.get("vote")),
        };
        Ok(vote.and_then(VoteValue::from_i32))
    }

    async fn counts(&self, target: VoteTarget) -> Result<VoteCounts> {
        let sql = r#"
            SELECT
                COUNT(CASE WHEN vote > 0 THEN 1 END) as likes,
                COUNT(CASE WHEN vote < 0 THEN 1 END) as dislikes
            FROM votes
            WHERE target_type = ? AND target_id = ?
        "#;
        let row = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let r = sqlx::query(sql)
                    .bind(target.kind())
                    .bind(target.id())
                    .fetch_one(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to count votes")?;
                (r.get::<i64, _>("likes"), r.get::<i64, _>("dislikes"))
            }
            DatabaseDriver::Mysql => {
                let r = sqlx::query(sql)
                    .bind(target.kind())
                    .bind(target.id())
                    .fetch_one(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to count votes")?;
                (r.get::<i64, _>("likes"), r.get::<i64, _>("dislikes"))
            }
        };
        Ok(VoteCounts {
            likes: row.0,
            dislikes: row.1,
        })
    }

    async fn rating(&self, target: VoteTarget) -> Result<i64> {
        let sql = r#"
            SELECT COALESCE(SUM(vote), 0) as rating
            FROM votes
            WHERE target_type = ? AND target_id = ?
        "#;
        let rating = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(target.kind())
                .bind(target.id())
                .fetch_one(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to compute rating")?
                .get("rating"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(target.kind())
                .bind(target.id())
                .fetch_one(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to compute rating")?
                .get("rating"),
        };
        Ok(rating)
    }

    async fn author_rating(&self, author_id: i64) -> Result<i64> {
        let sql = r#"
            SELECT COALESCE(SUM(v.vote), 0) as rating
            FROM votes v
            JOIN articles a ON v.target_type = 'article' AND v.target_id = a.id
            WHERE a.author_id = ?
        "#;
        let rating = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(author_id)
                .fetch_one(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to compute author rating")?
                .get("rating"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(author_id)
                .fetch_one(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to compute author rating")?
                .get("rating"),
        };
        Ok(rating)
    }

    async fn voters_for(&self, target: VoteTarget, value: VoteValue) -> Result<Vec<i64>> {
        let sql = r#"
            SELECT user_id FROM votes
            WHERE target_type = ? AND target_id = ? AND vote = ?
            ORDER BY user_id
        "#;
        let rows = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(target.kind())
                .bind(target.id())
                .bind(value.as_i32())
                .fetch_all(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to list voters")?
                .iter()
                .map(|r| r.get("user_id"))
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(target.kind())
                .bind(target.id())
                .bind(value.as_i32())
                .fetch_all(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to list voters")?
                .iter()
                .map(|r| r.get("user_id"))
                .collect(),
        };
        Ok(rows)
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
    use chrono::Utc;

    struct Fixture {
        votes: Arc<dyn VoteRepository>,
        users: Arc<dyn UserRepository>,
        articles: Arc<dyn ArticleRepository>,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        Fixture {
            votes: SqlxVoteRepository::boxed(pool.clone()),
            users: SqlxUserRepository::boxed(pool.clone()),
            articles: SqlxArticleRepository::boxed(pool),
        }
    }

    async fn make_user(fx: &Fixture, email: &str) -> i64 {
        fx.users
            .create(&User {
                id: 0,
                email: email.to_string(),
                first_name: "U".to_string(),
                last_name: "Ser".to_string(),
                password_hash: "hash".to_string(),
                role: UserRole::User,
                subscribed: false,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await
            .expect("Failed to create user")
            .id
    }

    async fn make_article(fx: &Fixture, author_id: i64) -> i64 {
        fx.articles
            .create(&Article {
                id: 0,
                title: "T".to_string(),
                text: "body".to_string(),
                source_name: None,
                source_link: None,
                is_published: true,
                views_count: 0,
                reading_time: 1,
                author_id,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await
            .expect("Failed to create article")
            .id
    }

    #[tokio::test]
    async fn test_cast_and_get() {
        let fx = setup().await;
        let author = make_user(&fx, "author@example.com").await;
        let voter = make_user(&fx, "voter@example.com").await;
        let target = VoteTarget::Article(make_article(&fx, author).await);

        assert_eq!(fx.votes.get(voter, target).await.unwrap(), None);

        fx.votes.cast(voter, target, VoteValue::Like).await.unwrap();
        assert_eq!(
            fx.votes.get(voter, target).await.unwrap(),
            Some(VoteValue::Like)
        );
    }

    #[tokio::test]
    async fn test_cast_returns_stored_row() {
        let fx = setup().await;
        let author = make_user(&fx, "author@example.com").await;
        let voter = make_user(&fx, "voter@example.com").await;
        let target = VoteTarget::Article(make_article(&fx, author).await);

        let first = fx.votes.cast(voter, target, VoteValue::Like).await.unwrap();
        assert_eq!(first.user_id, voter);
        assert_eq!(first.target, target);
        assert_eq!(first.vote, VoteValue::Like);

        // A changed vote updates the same row in place
        let second = fx.votes.cast(voter, target, VoteValue::Dislike).await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.vote, VoteValue::Dislike);
    }

    #[tokio::test]
    async fn test_cast_overwrites_previous_vote() {
        let fx = setup().await;
        let author = make_user(&fx, "author@example.com").await;
        let voter = make_user(&fx, "voter@example.com").await;
        let target = VoteTarget::Article(make_article(&fx, author).await);

        fx.votes.cast(voter, target, VoteValue::Like).await.unwrap();
        fx.votes.cast(voter, target, VoteValue::Dislike).await.unwrap();

        // Only one row exists and it holds the latest value
        assert_eq!(
            fx.votes.get(voter, target).await.unwrap(),
            Some(VoteValue::Dislike)
        );
        let counts = fx.votes.counts(target).await.unwrap();
        assert_eq!(counts, VoteCounts { likes: 0, dislikes: 1 });
    }

    #[tokio::test]
    async fn test_retract_leaves_no_trace() {
        let fx = setup().await;
        let author = make_user(&fx, "author@example.com").await;
        let voter = make_user(&fx, "voter@example.com").await;
        let target = VoteTarget::Article(make_article(&fx, author).await);

        fx.votes.cast(voter, target, VoteValue::Like).await.unwrap();
        fx.votes.cast(voter, target, VoteValue::Dislike).await.unwrap();
        assert!(fx.votes.retract(voter, target).await.unwrap());

        assert_eq!(fx.votes.get(voter, target).await.unwrap(), None);
        assert_eq!(fx.votes.rating(target).await.unwrap(), 0);

        // Retracting again is a no-op
        assert!(!fx.votes.retract(voter, target).await.unwrap());
    }

    #[tokio::test]
    async fn test_rating_and_counts() {
        let fx = setup().await;
        let author = make_user(&fx, "author@example.com").await;
        let target = VoteTarget::Article(make_article(&fx, author).await);

        for (i, value) in [
            VoteValue::Like,
            VoteValue::Like,
            VoteValue::Like,
            VoteValue::Dislike,
        ]
        .iter()
        .enumerate()
        {
            let voter = make_user(&fx, &format!("voter{}@example.com", i)).await;
            fx.votes.cast(voter, target, *value).await.unwrap();
        }

        assert_eq!(fx.votes.rating(target).await.unwrap(), 2);
        let counts = fx.votes.counts(target).await.unwrap();
        assert_eq!(counts, VoteCounts { likes: 3, dislikes: 1 });
        assert_eq!(counts.rating(), 2);
    }

    #[tokio::test]
    async fn test_author_rating_sums_article_votes() {
        let fx = setup().await;
        let author = make_user(&fx, "author@example.com").await;
        let other = make_user(&fx, "other@example.com").await;
        let a1 = VoteTarget::Article(make_article(&fx, author).await);
        let a2 = VoteTarget::Article(make_article(&fx, author).await);
        let foreign = VoteTarget::Article(make_article(&fx, other).await);

        let v1 = make_user(&fx, "v1@example.com").await;
        let v2 = make_user(&fx, "v2@example.com").await;

        fx.votes.cast(v1, a1, VoteValue::Like).await.unwrap();
        fx.votes.cast(v2, a1, VoteValue::Like).await.unwrap();
        fx.votes.cast(v1, a2, VoteValue::Dislike).await.unwrap();
        fx.votes.cast(v1, foreign, VoteValue::Like).await.unwrap();

        assert_eq!(fx.votes.author_rating(author).await.unwrap(), 1);
        assert_eq!(fx.votes.author_rating(other).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_voters_for_splits_by_value() {
        let fx = setup().await;
        let author = make_user(&fx, "author@example.com").await;
        let target = VoteTarget::Article(make_article(&fx, author).await);

        let fan1 = make_user(&fx, "fan1@example.com").await;
        let fan2 = make_user(&fx, "fan2@example.com").await;
        let hater = make_user(&fx, "hater@example.com").await;

        fx.votes.cast(fan1, target, VoteValue::Like).await.unwrap();
        fx.votes.cast(fan2, target, VoteValue::Like).await.unwrap();
        fx.votes.cast(hater, target, VoteValue::Dislike).await.unwrap();

        let mut fans = fx.votes.voters_for(target, VoteValue::Like).await.unwrap();
        fans.sort_unstable();
        let mut expected = vec![fan1, fan2];
        expected.sort_unstable();
        assert_eq!(fans, expected);
        assert_eq!(
            fx.votes.voters_for(target, VoteValue::Dislike).await.unwrap(),
            vec![hater]
        );
    }

    #[tokio::test]
    async fn test_article_and_comment_votes_are_independent() {
        let fx = setup().await;
        let author = make_user(&fx, "author@example.com").await;
        let voter = make_user(&fx, "voter@example.com").await;
        let id = make_article(&fx, author).await;

        // Same numeric ID, different target kinds
        fx.votes
            .cast(voter, VoteTarget::Article(id), VoteValue::Like)
            .await
            .unwrap();
        fx.votes
            .cast(voter, VoteTarget::Comment(id), VoteValue::Dislike)
            .await
            .unwrap();

        assert_eq!(fx.votes.rating(VoteTarget::Article(id)).await.unwrap(), 1);
        assert_eq!(fx.votes.rating(VoteTarget::Comment(id)).await.unwrap(), -1);
    }
}
