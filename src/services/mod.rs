//! Services layer - Business logic
//!
//! This module contains all business logic services for the Redakt platform.
//! Services are responsible for:
//! - Implementing business rules
//! - Coordinating between repositories
//! - Handling validation and error cases

pub mod article;
pub mod comment;
pub mod favorite;
pub mod password;
pub mod tag;
pub mod user;
pub mod vote;

pub use article::{ArticleService, ArticleServiceError};
pub use comment::{CommentService, CommentServiceError};
pub use favorite::{FavoriteService, FavoriteServiceError};
pub use password::{hash_password, verify_password};
pub use tag::{TagService, TagServiceError};
pub use user::{LoginInput, UserProfile, UserService, UserServiceError};
pub use vote::{TargetReactions, VoteService, VoteServiceError};
