//! Data models
//!
//! This module contains all data structures used throughout the Redakt platform.
//! Models represent:
//! - Database entities (User, Session, Article, Tag, Vote, Comment)
//! - API request/response types
//! - Internal data transfer objects

mod article;
mod comment;
mod session;
mod tag;
mod user;
mod vote;

pub use article::{
    estimate_reading_time, Article, CreateArticleInput, ListParams, PagedResult,
    UpdateArticleInput, READING_SPEED_WPM,
};
pub use comment::{Comment, CreateCommentInput};
pub use session::Session;
pub use tag::{slugify, CreateTagInput, Tag, TagRelation};
pub use user::{CreateUserInput, UpdateUserInput, User, UserRole};
pub use vote::{Vote, VoteTarget, VoteValue};
