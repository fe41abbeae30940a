//! Vote model
//!
//! Votes live in a single polymorphic ledger. A vote row records one user's
//! current stance toward one target; the (user, target) pair is unique, so a
//! user never holds more than one vote on the same target.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single vote in the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    /// Unique identifier
    pub id: i64,
    /// Voting user ID
    pub user_id: i64,
    /// Target of the vote
    pub target: VoteTarget,
    /// Vote value
    pub vote: VoteValue,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// What a vote is attached to.
///
/// Adding a new votable entity means adding a variant here; the ledger
/// schema does not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum VoteTarget {
    /// An article
    Article(i64),
    /// A comment
    Comment(i64),
}

impl VoteTarget {
    /// Database discriminator for the target kind
    pub fn kind(&self) -> &'static str {
        match self {
            VoteTarget::Article(_) => "article",
            VoteTarget::Comment(_) => "comment",
        }
    }

    /// ID of the target entity
    pub fn id(&self) -> i64 {
        match self {
            VoteTarget::Article(id) | VoteTarget::Comment(id) => *id,
        }
    }

    /// Reconstruct a target from its database representation
    pub fn from_parts(kind: &str, id: i64) -> Option<Self> {
        match kind {
            "article" => Some(VoteTarget::Article(id)),
            "comment" => Some(VoteTarget::Comment(id)),
            _ => None,
        }
    }
}

/// Vote value: approval or disapproval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteValue {
    /// Approval (+1)
    Like,
    /// Disapproval (-1)
    Dislike,
}

impl VoteValue {
    /// Signed integer stored in the ledger
    pub fn as_i32(&self) -> i32 {
        match self {
            VoteValue::Like => 1,
            VoteValue::Dislike => -1,
        }
    }

    /// Reconstruct a value from its stored integer
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            1 => Some(VoteValue::Like),
            -1 => Some(VoteValue::Dislike),
            _ => None,
        }
    }

    /// Parse a vote value from a URL path segment
    pub fn from_slug(s: &str) -> Option<Self> {
        match s {
            "like" => Some(VoteValue::Like),
            "dislike" => Some(VoteValue::Dislike),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_parts_round_trip() {
        let targets = [VoteTarget::Article(7), VoteTarget::Comment(12)];
        for target in targets {
            assert_eq!(
                VoteTarget::from_parts(target.kind(), target.id()),
                Some(target)
            );
        }
        assert_eq!(VoteTarget::from_parts("page", 1), None);
    }

    #[test]
    fn test_value_integers() {
        assert_eq!(VoteValue::Like.as_i32(), 1);
        assert_eq!(VoteValue::Dislike.as_i32(), -1);
        assert_eq!(VoteValue::from_i32(1), Some(VoteValue::Like));
        assert_eq!(VoteValue::from_i32(-1), Some(VoteValue::Dislike));
        assert_eq!(VoteValue::from_i32(0), None);
    }

    #[test]
    fn test_value_from_slug() {
        assert_eq!(VoteValue::from_slug("like"), Some(VoteValue::Like));
        assert_eq!(VoteValue::from_slug("dislike"), Some(VoteValue::Dislike));
        assert_eq!(VoteValue::from_slug("upvote"), None);
    }
}
