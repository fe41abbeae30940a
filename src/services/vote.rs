//! Vote service
//!
//! Business logic on top of the vote ledger:
//! - Casting and retracting votes with self-vote rejection
//! - Read-time aggregation of ratings and reactions
//!
//! Comment targets go through the same ledger and the same rules as
//! articles; the handlers only differ in how they name the target.

use crate::db::repositories::{ArticleRepository, CommentRepository, VoteRepository};
use crate::models::{Vote, VoteTarget, VoteValue};
use anyhow::Context;
use serde::Serialize;
use std::sync::Arc;

/// Error types for vote service operations
#[derive(Debug, thiserror::Error)]
pub enum VoteServiceError {
    /// Vote target not found
    #[error("Vote target not found")]
    TargetNotFound,

    /// Users may not vote on their own content
    #[error("Voting on your own content is not allowed")]
    SelfVote,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Aggregated reaction state of one target, optionally from the point of
/// view of a specific user
#[derive(Debug, Clone, Serialize)]
pub struct TargetReactions {
    /// Net rating (sum of vote values)
    pub rating: i64,
    /// Number of positive votes
    pub likes_count: i64,
    /// Number of negative votes
    pub dislikes_count: i64,
    /// Whether the viewing user has a positive vote
    pub is_fan: bool,
    /// Whether the viewing user has a negative vote
    pub is_hater: bool,
}

/// Vote service
pub struct VoteService {
    votes: Arc<dyn VoteRepository>,
    articles: Arc<dyn ArticleRepository>,
    comments: Arc<dyn CommentRepository>,
}

impl VoteService {
    /// Create a new vote service
    pub fn new(
        votes: Arc<dyn VoteRepository>,
        articles: Arc<dyn ArticleRepository>,
        comments: Arc<dyn CommentRepository>,
    ) -> Self {
        Self {
            votes,
            articles,
            comments,
        }
    }

    /// Cast or change a vote, returning the stored record.
    ///
    /// A repeated cast with a different value overwrites the previous vote.
    ///
    /// # Errors
    /// - `TargetNotFound` if the target entity does not exist
    /// - `SelfVote` if the user authored the target
    pub async fn cast(
        &self,
        user_id: i64,
        target: VoteTarget,
        value: VoteValue,
    ) -> Result<Vote, VoteServiceError> {
        let author_id = self.author_of(target).await?;
        if author_id == user_id {
            return Err(VoteServiceError::SelfVote);
        }

        let vote = self
            .votes
            .cast(user_id, target, value)
            .await
            .context("Failed to cast vote")?;
        tracing::debug!(user_id, kind = target.kind(), target_id = target.id(), "Vote cast");
        Ok(vote)
    }

    /// Retract a vote. Retracting when no vote exists is a no-op.
    ///
    /// # Errors
    /// - `TargetNotFound` if the target entity does not exist
    pub async fn retract(&self, user_id: i64, target: VoteTarget) -> Result<(), VoteServiceError> {
        self.author_of(target).await?;

        let removed = self
            .votes
            .retract(user_id, target)
            .await
            .context("Failed to retract vote")?;
        if removed {
            tracing::debug!(user_id, kind = target.kind(), target_id = target.id(), "Vote retracted");
        }
        Ok(())
    }

    /// Aggregate the reaction state of a target.
    ///
    /// `viewer` is the requesting user, if authenticated; anonymous viewers
    /// always see `is_fan` and `is_hater` as false.
    pub async fn reactions(
        &self,
        target: VoteTarget,
        viewer: Option<i64>,
    ) -> Result<TargetReactions, VoteServiceError> {
        let counts = self
            .votes
            .counts(target)
            .await
            .context("Failed to count votes")?;

        let own_vote = match viewer {
            Some(user_id) => self
                .votes
                .get(user_id, target)
                .await
                .context("Failed to get own vote")?,
            None => None,
        };

        Ok(TargetReactions {
            rating: counts.rating(),
            likes_count: counts.likes,
            dislikes_count: counts.dislikes,
            is_fan: own_vote == Some(VoteValue::Like),
            is_hater: own_vote == Some(VoteValue::Dislike),
        })
    }

    /// IDs of the users who cast the given vote value on a target
    pub async fn voters(
        &self,
        target: VoteTarget,
        value: VoteValue,
    ) -> Result<Vec<i64>, VoteServiceError> {
        self.author_of(target).await?;
        self.votes
            .voters_for(target, value)
            .await
            .context("Failed to list voters")
            .map_err(Into::into)
    }

    async fn author_of(&self, target: VoteTarget) -> Result<i64, VoteServiceError> {
        match target {
            VoteTarget::Article(id) => Ok(self
                .articles
                .get_by_id(id)
                .await
                .context("Failed to load article")?
                .ok_or(VoteServiceError::TargetNotFound)?
                .author_id),
            VoteTarget::Comment(id) => Ok(self
                .comments
                .get_by_id(id)
                .await
                .context("Failed to load comment")?
                .ok_or(VoteServiceError::TargetNotFound)?
                .author_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        ArticleRepository, SqlxArticleRepository, SqlxCommentRepository, SqlxUserRepository,
        SqlxVoteRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Article, User, UserRole};
    use chrono::Utc;

    struct Fixture {
        service: VoteService,
        users: Arc<dyn UserRepository>,
        articles: Arc<dyn ArticleRepository>,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        Fixture {
            service: VoteService::new(
                SqlxVoteRepository::boxed(pool.clone()),
                SqlxArticleRepository::boxed(pool.clone()),
                SqlxCommentRepository::boxed(pool.clone()),
            ),
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

    async fn make_article(fx: &Fixture, author_id: i64) -> VoteTarget {
        let article = fx
            .articles
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
            .expect("Failed to create article");
        VoteTarget::Article(article.id)
    }

    #[tokio::test]
    async fn test_self_vote_is_rejected() {
        let fx = setup().await;
        let author = make_user(&fx, "author@example.com").await;
        let target = make_article(&fx, author).await;

        let err = fx
            .service
            .cast(author, target, VoteValue::Like)
            .await
            .unwrap_err();
        assert!(matches!(err, VoteServiceError::SelfVote));

        let reactions = fx.service.reactions(target, Some(author)).await.unwrap();
        assert_eq!(reactions.rating, 0);
    }

    #[tokio::test]
    async fn test_cast_missing_target() {
        let fx = setup().await;
        let voter = make_user(&fx, "voter@example.com").await;

        let err = fx
            .service
            .cast(voter, VoteTarget::Article(9999), VoteValue::Like)
            .await
            .unwrap_err();
        assert!(matches!(err, VoteServiceError::TargetNotFound));
    }

    #[tokio::test]
    async fn test_reactions_reflect_viewer() {
        let fx = setup().await;
        let author = make_user(&fx, "author@example.com").await;
        let fan = make_user(&fx, "fan@example.com").await;
        let hater = make_user(&fx, "hater@example.com").await;
        let target = make_article(&fx, author).await;

        fx.service.cast(fan, target, VoteValue::Like).await.unwrap();
        fx.service.cast(hater, target, VoteValue::Dislike).await.unwrap();

        let as_fan = fx.service.reactions(target, Some(fan)).await.unwrap();
        assert!(as_fan.is_fan && !as_fan.is_hater);
        assert_eq!(as_fan.rating, 0);
        assert_eq!(as_fan.likes_count, 1);
        assert_eq!(as_fan.dislikes_count, 1);

        let as_hater = fx.service.reactions(target, Some(hater)).await.unwrap();
        assert!(!as_hater.is_fan && as_hater.is_hater);

        let anonymous = fx.service.reactions(target, None).await.unwrap();
        assert!(!anonymous.is_fan && !anonymous.is_hater);
    }

    #[tokio::test]
    async fn test_change_then_retract_leaves_clean_ledger() {
        let fx = setup().await;
        let author = make_user(&fx, "author@example.com").await;
        let voter = make_user(&fx, "voter@example.com").await;
        let target = make_article(&fx, author).await;

        let cast = fx.service.cast(voter, target, VoteValue::Like).await.unwrap();
        assert_eq!(cast.user_id, voter);
        assert_eq!(cast.vote, VoteValue::Like);

        let changed = fx.service.cast(voter, target, VoteValue::Dislike).await.unwrap();
        assert_eq!(changed.id, cast.id);
        fx.service.retract(voter, target).await.unwrap();

        let reactions = fx.service.reactions(target, Some(voter)).await.unwrap();
        assert_eq!(reactions.rating, 0);
        assert_eq!(reactions.likes_count, 0);
        assert_eq!(reactions.dislikes_count, 0);

        // Retracting with nothing on the ledger succeeds silently
        fx.service.retract(voter, target).await.unwrap();
    }
}
