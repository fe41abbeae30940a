//! User model
//!
//! This module provides:
//! - `User` entity representing a platform account
//! - `UserRole` enum for permission levels
//! - Input types for registration and profile updates

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Email address (unique, used for login)
    pub email: String,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Argon2 password hash (never serialized to API responses)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Permission role
    pub role: UserRole,
    /// Whether the user is subscribed to publication updates
    pub subscribed: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Full display name
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Check if the user can moderate content
    pub fn is_moderator(&self) -> bool {
        matches!(self.role, UserRole::Moderator | UserRole::Admin)
    }

    /// Check if the user has admin privileges
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// User permission role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular user (default)
    #[default]
    User,
    /// Moderator - can edit and remove any content
    Moderator,
    /// Administrator - full access including tag hierarchy management
    Admin,
}

impl UserRole {
    /// Convert role to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Moderator => "moderator",
            UserRole::Admin => "admin",
        }
    }

    /// Parse role from database string representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user" => Some(UserRole::User),
            "moderator" => Some(UserRole::Moderator),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input for registering a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserInput {
    /// Email address
    pub email: String,
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Plain-text password (hashed before storage)
    pub password: String,
}

/// Input for updating an existing user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserInput {
    /// New first name (optional)
    pub first_name: Option<String>,
    /// New last name (optional)
    pub last_name: Option<String>,
    /// New plain-text password (optional, hashed before storage)
    pub password: Option<String>,
}

impl UpdateUserInput {
    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.first_name.is_some() || self.last_name.is_some() || self.password.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [UserRole::User, UserRole::Moderator, UserRole::Admin] {
            assert_eq!(UserRole::from_str(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::from_str("superuser"), None);
    }

    #[test]
    fn test_moderation_privileges() {
        let mut user = User {
            id: 1,
            email: "a@b.c".to_string(),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            password_hash: String::new(),
            role: UserRole::User,
            subscribed: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(!user.is_moderator());
        assert!(!user.is_admin());

        user.role = UserRole::Moderator;
        assert!(user.is_moderator());
        assert!(!user.is_admin());

        user.role = UserRole::Admin;
        assert!(user.is_moderator());
        assert!(user.is_admin());
    }
}
