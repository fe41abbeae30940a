//! Session model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated session backed by an opaque token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session token (UUID v4)
    pub id: String,
    /// Owning user ID
    pub user_id: i64,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_expiry() {
        let session = Session {
            id: "token".to_string(),
            user_id: 1,
            expires_at: Utc::now() + Duration::hours(1),
            created_at: Utc::now(),
        };
        assert!(!session.is_expired());

        let expired = Session {
            expires_at: Utc::now() - Duration::hours(1),
            ..session
        };
        assert!(expired.is_expired());
    }
}
