//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity.

pub mod article;
pub mod comment;
pub mod favorite;
pub mod session;
pub mod tag;
pub mod user;
pub mod vote;

pub use article::{ArticleRepository, SqlxArticleRepository};
pub use comment::{CommentRepository, SqlxCommentRepository};
pub use favorite::{FavoriteRepository, SqlxFavoriteRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use tag::{RelationChange, SqlxTagRepository, TagRepository};
pub use user::{SqlxUserRepository, UserRepository};
pub use vote::{SqlxVoteRepository, VoteCounts, VoteRepository};
