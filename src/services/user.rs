//! User service
//!
//! Business logic for accounts and authentication:
//! - Registration with email uniqueness and password hashing
//! - Login/logout with opaque session tokens
//! - Session validation
//! - Profile with computed rating and publication count
//! - Subscription flag toggling

use crate::db::repositories::{
    ArticleRepository, SessionRepository, UserRepository, VoteRepository,
};
use crate::models::{CreateUserInput, Session, UpdateUserInput, User};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Session lifetime in days
pub const SESSION_TTL_DAYS: i64 = 30;

/// Stricter-than-RFC email check: ASCII letters, digits, `.`, `_` and `-`
/// in the local part; dot-separated labels of letters, digits and `-` in
/// the domain, at least two of them.
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty()
        || !local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && label
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

/// Names allow letters (any alphabet), spaces and hyphens.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphabetic() || c == ' ' || c == '-')
}

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// User not found
    #[error("User not found")]
    NotFound,

    /// Email already registered
    #[error("Email already registered: {0}")]
    EmailTaken(String),

    /// Bad credentials on login
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Session missing or expired
    #[error("Invalid or expired session")]
    InvalidSession,

    /// The subscription flag already has the requested value
    #[error("Subscription flag already set to {0}")]
    SubscriptionUnchanged(bool),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Login request payload
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    /// Email address
    pub email: String,
    /// Plain-text password
    pub password: String,
}

/// User profile with computed statistics
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    /// The user record
    #[serde(flatten)]
    pub user: User,
    /// Net rating: sum of all votes on the user's articles
    pub rating: i64,
    /// Number of articles the user has authored
    pub publications_count: i64,
}

/// User service for accounts and sessions
pub struct UserService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    articles: Arc<dyn ArticleRepository>,
    votes: Arc<dyn VoteRepository>,
}

impl UserService {
    /// Create a new user service
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
        articles: Arc<dyn ArticleRepository>,
        votes: Arc<dyn VoteRepository>,
    ) -> Self {
        Self {
            users,
            sessions,
            articles,
            votes,
        }
    }

    /// Register a new user
    ///
    /// # Errors
    /// - `ValidationError` if the email, password or a name is malformed
    /// - `EmailTaken` if the email is already registered
    pub async fn register(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        let email = input.email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(UserServiceError::ValidationError(
                "Invalid email address".to_string(),
            ));
        }
        if input.password.len() < 8 {
            return Err(UserServiceError::ValidationError(
                "Password must be at least 8 characters".to_string(),
            ));
        }
        if !is_valid_name(input.first_name.trim()) || !is_valid_name(input.last_name.trim()) {
            return Err(UserServiceError::ValidationError(
                "Names may only contain letters, spaces, and hyphens".to_string(),
            ));
        }

        if self
            .users
            .get_by_email(&email)
            .await
            .context("Failed to check existing email")?
            .is_some()
        {
            return Err(UserServiceError::EmailTaken(email));
        }

        let password_hash = hash_password(&input.password)?;
        let now = Utc::now();
        let user = User {
            id: 0,
            email,
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            password_hash,
            role: Default::default(),
            subscribed: false,
            created_at: now,
            updated_at: now,
        };

        let created = self
            .users
            .create(&user)
            .await
            .context("Failed to create user")?;

        tracing::info!(user_id = created.id, "Registered new user");
        Ok(created)
    }

    /// Authenticate a user and open a session
    ///
    /// # Errors
    /// - `InvalidCredentials` if the email is unknown or the password wrong
    pub async fn login(&self, input: LoginInput) -> Result<(User, Session), UserServiceError> {
        let email = input.email.trim().to_lowercase();
        let user = self
            .users
            .get_by_email(&email)
            .await
            .context("Failed to look up user")?
            .ok_or(UserServiceError::InvalidCredentials)?;

        if !verify_password(&input.password, &user.password_hash)? {
            return Err(UserServiceError::InvalidCredentials);
        }

        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id: user.id,
            expires_at: now + Duration::days(SESSION_TTL_DAYS),
            created_at: now,
        };
        self.sessions
            .create(&session)
            .await
            .context("Failed to create session")?;

        tracing::info!(user_id = user.id, "User logged in");
        Ok((user, session))
    }

    /// Close a session (logout)
    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.sessions
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a session token to its user.
    ///
    /// Expired sessions are deleted on sight.
    pub async fn validate_session(&self, token: &str) -> Result<User, UserServiceError> {
        let session = self
            .sessions
            .get_by_id(token)
            .await
            .context("Failed to look up session")?
            .ok_or(UserServiceError::InvalidSession)?;

        if session.is_expired() {
            let _ = self.sessions.delete(token).await;
            return Err(UserServiceError::InvalidSession);
        }

        self.users
            .get_by_id(session.user_id)
            .await
            .context("Failed to load session user")?
            .ok_or(UserServiceError::InvalidSession)
    }

    /// Get a user's profile with computed statistics
    pub async fn profile(&self, user_id: i64) -> Result<UserProfile, UserServiceError> {
        let user = self
            .users
            .get_by_id(user_id)
            .await
            .context("Failed to load user")?
            .ok_or(UserServiceError::NotFound)?;

        let rating = self
            .votes
            .author_rating(user_id)
            .await
            .context("Failed to compute user rating")?;
        let publications_count = self
            .articles
            .count_by_author(user_id)
            .await
            .context("Failed to count publications")?;

        Ok(UserProfile {
            user,
            rating,
            publications_count,
        })
    }

    /// Update profile fields
    pub async fn update_profile(
        &self,
        user_id: i64,
        input: UpdateUserInput,
    ) -> Result<User, UserServiceError> {
        let user = self
            .users
            .get_by_id(user_id)
            .await
            .context("Failed to load user")?
            .ok_or(UserServiceError::NotFound)?;

        if !input.has_changes() {
            return Ok(user);
        }

        let first_name = input.first_name.unwrap_or(user.first_name);
        let last_name = input.last_name.unwrap_or(user.last_name);
        if !is_valid_name(first_name.trim()) || !is_valid_name(last_name.trim()) {
            return Err(UserServiceError::ValidationError(
                "Names may only contain letters, spaces, and hyphens".to_string(),
            ));
        }
        let password_hash = match input.password {
            Some(password) => {
                if password.len() < 8 {
                    return Err(UserServiceError::ValidationError(
                        "Password must be at least 8 characters".to_string(),
                    ));
                }
                hash_password(&password)?
            }
            None => user.password_hash,
        };

        self.users
            .update_profile(user_id, &first_name, &last_name, &password_hash)
            .await
            .context("Failed to update profile")?;

        self.users
            .get_by_id(user_id)
            .await
            .context("Failed to reload user")?
            .ok_or(UserServiceError::NotFound)
    }

    /// Set the subscription flag.
    ///
    /// # Errors
    /// - `SubscriptionUnchanged` if the flag already has the requested value
    pub async fn set_subscribed(
        &self,
        user_id: i64,
        subscribed: bool,
    ) -> Result<(), UserServiceError> {
        if self
            .users
            .get_by_id(user_id)
            .await
            .context("Failed to load user")?
            .is_none()
        {
            return Err(UserServiceError::NotFound);
        }

        let changed = self
            .users
            .set_subscribed(user_id, subscribed)
            .await
            .context("Failed to set subscription flag")?;

        if !changed {
            return Err(UserServiceError::SubscriptionUnchanged(subscribed));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxArticleRepository, SqlxSessionRepository, SqlxUserRepository, SqlxVoteRepository,
    };
    use crate::db::{create_test_pool, migrations};

    async fn setup() -> UserService {
        let pool = create_test_pool().await.expect("Failed to create pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            SqlxArticleRepository::boxed(pool.clone()),
            SqlxVoteRepository::boxed(pool),
        )
    }

    fn registration(email: &str) -> CreateUserInput {
        CreateUserInput {
            email: email.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            password: "analytical engine".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_normalizes_email() {
        let service = setup().await;
        let user = service
            .register(registration("  Ada@Example.COM "))
            .await
            .expect("Failed to register");
        assert_eq!(user.email, "ada@example.com");
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_bad_input() {
        let service = setup().await;
        service.register(registration("ada@example.com")).await.unwrap();

        let err = service
            .register(registration("ada@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, UserServiceError::EmailTaken(_)));

        let mut short = registration("short@example.com");
        short.password = "tiny".to_string();
        assert!(matches!(
            service.register(short).await.unwrap_err(),
            UserServiceError::ValidationError(_)
        ));

        let bad_email = registration("not-an-email");
        assert!(matches!(
            service.register(bad_email).await.unwrap_err(),
            UserServiceError::ValidationError(_)
        ));

        let mut bad_name = registration("grace@example.com");
        bad_name.first_name = "Grace2".to_string();
        assert!(matches!(
            service.register(bad_name).await.unwrap_err(),
            UserServiceError::ValidationError(_)
        ));
    }

    #[test]
    fn test_email_charset_rules() {
        for email in [
            "u@u.com",
            "user.user@example.com",
            "user-user@example.com",
            "user_user@example.com",
            "user_user.user-user@example.example-example.com",
        ] {
            assert!(is_valid_email(email), "{email} should be accepted");
        }

        for email in [
            "SS#%&@example.com",
            "SS#%&@exam#@#@ple.com",
            "@example.com",
            "user.user@example.",
            "user.user@.com",
            "user_user.user-user@example.example_example.com",
            "123456",
            "user@localhost",
        ] {
            assert!(!is_valid_email(email), "{email} should be rejected");
        }
    }

    #[test]
    fn test_name_charset_rules() {
        assert!(is_valid_name("Ada"));
        assert!(is_valid_name("Anne-Marie"));
        assert!(is_valid_name("Анна Мария"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("R2D2"));
        assert!(!is_valid_name("O'Brien"));
    }

    #[tokio::test]
    async fn test_login_and_session_round_trip() {
        let service = setup().await;
        let user = service.register(registration("ada@example.com")).await.unwrap();

        let (logged_in, session) = service
            .login(LoginInput {
                email: "ada@example.com".to_string(),
                password: "analytical engine".to_string(),
            })
            .await
            .expect("Login should succeed");
        assert_eq!(logged_in.id, user.id);

        let resolved = service.validate_session(&session.id).await.unwrap();
        assert_eq!(resolved.id, user.id);

        service.logout(&session.id).await.unwrap();
        assert!(matches!(
            service.validate_session(&session.id).await.unwrap_err(),
            UserServiceError::InvalidSession
        ));
    }

    #[tokio::test]
    async fn test_login_rejects_wrong_password() {
        let service = setup().await;
        service.register(registration("ada@example.com")).await.unwrap();

        let err = service
            .login(LoginInput {
                email: "ada@example.com".to_string(),
                password: "difference engine".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, UserServiceError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_subscription_toggle() {
        let service = setup().await;
        let user = service.register(registration("ada@example.com")).await.unwrap();

        service.set_subscribed(user.id, true).await.unwrap();
        assert!(matches!(
            service.set_subscribed(user.id, true).await.unwrap_err(),
            UserServiceError::SubscriptionUnchanged(true)
        ));

        service.set_subscribed(user.id, false).await.unwrap();
        assert!(matches!(
            service.set_subscribed(user.id, false).await.unwrap_err(),
            UserServiceError::SubscriptionUnchanged(false)
        ));
    }

    #[tokio::test]
    async fn test_profile_starts_empty() {
        let service = setup().await;
        let user = service.register(registration("ada@example.com")).await.unwrap();

        let profile = service.profile(user.id).await.unwrap();
        assert_eq!(profile.rating, 0);
        assert_eq!(profile.publications_count, 0);
    }
}
