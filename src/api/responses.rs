//! Shared API response types
//!
//! Common response structures used across multiple API endpoints.

use serde::{Deserialize, Serialize};

use crate::models::{Article, Comment, Tag, User};
use crate::services::TargetReactions;

/// Tag info embedded in article and tag responses
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TagInfo {
    pub id: i64,
    pub slug: String,
    pub name: String,
}

impl From<Tag> for TagInfo {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id,
            slug: tag.slug,
            name: tag.name,
        }
    }
}

/// Full article response with tags and reaction state
///
/// Used in article detail endpoints. The reaction flags (`is_fan`,
/// `is_hater`, `is_favorited`) reflect the requesting user and are
/// always false for anonymous requests.
#[derive(Debug, Serialize)]
pub struct ArticleResponse {
    pub id: i64,
    pub title: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_link: Option<String>,
    pub is_published: bool,
    pub views_count: i64,
    pub reading_time: i64,
    pub author_id: i64,
    pub created_at: String,
    pub updated_at: String,
    pub tags: Vec<TagInfo>,
    pub rating: i64,
    pub likes_count: i64,
    pub dislikes_count: i64,
    pub is_fan: bool,
    pub is_hater: bool,
    pub is_favorited: bool,
}

impl ArticleResponse {
    pub fn build(
        article: Article,
        tags: Vec<Tag>,
        reactions: TargetReactions,
        is_favorited: bool,
    ) -> Self {
        Self {
            id: article.id,
            title: article.title,
            text: article.text,
            source_name: article.source_name,
            source_link: article.source_link,
            is_published: article.is_published,
            views_count: article.views_count,
            reading_time: article.reading_time,
            author_id: article.author_id,
            created_at: article.created_at.to_rfc3339(),
            updated_at: article.updated_at.to_rfc3339(),
            tags: tags.into_iter().map(TagInfo::from).collect(),
            rating: reactions.rating,
            likes_count: reactions.likes_count,
            dislikes_count: reactions.dislikes_count,
            is_fan: reactions.is_fan,
            is_hater: reactions.is_hater,
            is_favorited,
        }
    }
}

/// Simplified article response for list views
#[derive(Debug, Serialize)]
pub struct ArticleSummary {
    pub id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    pub views_count: i64,
    pub reading_time: i64,
    pub author_id: i64,
    pub created_at: String,
}

impl From<Article> for ArticleSummary {
    fn from(article: Article) -> Self {
        Self {
            id: article.id,
            title: article.title,
            source_name: article.source_name,
            views_count: article.views_count,
            reading_time: article.reading_time,
            author_id: article.author_id,
            created_at: article.created_at.to_rfc3339(),
        }
    }
}

/// Paginated article list response
#[derive(Debug, Serialize)]
pub struct PaginatedArticlesResponse {
    pub articles: Vec<ArticleSummary>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl From<crate::models::PagedResult<Article>> for PaginatedArticlesResponse {
    fn from(result: crate::models::PagedResult<Article>) -> Self {
        let total_pages = result.total_pages();
        Self {
            articles: result.items.into_iter().map(ArticleSummary::from).collect(),
            total: result.total,
            page: result.page,
            per_page: result.per_page,
            total_pages,
        }
    }
}

/// Response for user info
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub subscribed: bool,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role.to_string(),
            subscribed: user.subscribed,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Response for a comment
#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub id: i64,
    pub article_id: i64,
    pub author_id: i64,
    pub text: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            article_id: comment.article_id,
            author_id: comment.author_id,
            text: comment.text,
            created_at: comment.created_at.to_rfc3339(),
            updated_at: comment.updated_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_article_summary_omits_body() {
        let article = Article {
            id: 1,
            title: "Title".to_string(),
            text: "A long body".to_string(),
            source_name: None,
            source_link: None,
            is_published: true,
            views_count: 3,
            reading_time: 1,
            author_id: 7,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let summary = ArticleSummary::from(article);
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("text").is_none());
        assert!(json.get("source_name").is_none());
        assert_eq!(json["views_count"], 3);
    }
}
