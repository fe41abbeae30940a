//! Article model
//!
//! This module provides:
//! - `Article` entity representing a publication
//! - Input types for creating and updating articles
//! - Pagination types for list queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Assumed reading speed used to estimate reading time, in words per minute.
pub const READING_SPEED_WPM: usize = 200;

/// Article entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    /// Unique identifier
    pub id: i64,
    /// Article title
    pub title: String,
    /// Article body
    pub text: String,
    /// Name of the original source, if republished
    pub source_name: Option<String>,
    /// Link to the original source, if republished
    pub source_link: Option<String>,
    /// Whether the article is visible to readers
    pub is_published: bool,
    /// Number of detail views
    #[serde(default)]
    pub views_count: i64,
    /// Estimated reading time in minutes
    #[serde(default)]
    pub reading_time: i64,
    /// Author user ID
    pub author_id: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Estimate reading time in minutes from article text.
///
/// Very short texts still report one minute so the field is never zero
/// for a non-empty article.
pub fn estimate_reading_time(text: &str) -> i64 {
    let words = text.split_whitespace().count();
    if words == 0 {
        return 0;
    }
    ((words + READING_SPEED_WPM - 1) / READING_SPEED_WPM) as i64
}

/// Input for creating a new article
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateArticleInput {
    /// Article title
    pub title: String,
    /// Article body
    pub text: String,
    /// Name of the original source (optional)
    pub source_name: Option<String>,
    /// Link to the original source (optional)
    pub source_link: Option<String>,
    /// Whether to publish immediately (defaults to false)
    #[serde(default)]
    pub is_published: bool,
    /// Tag IDs to attach
    #[serde(default)]
    pub tags: Vec<i64>,
}

/// Input for updating an existing article
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateArticleInput {
    /// New title (optional)
    pub title: Option<String>,
    /// New body (optional)
    pub text: Option<String>,
    /// New source name (optional)
    pub source_name: Option<String>,
    /// New source link (optional)
    pub source_link: Option<String>,
    /// New publication state (optional)
    pub is_published: Option<bool>,
}

impl UpdateArticleInput {
    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.title.is_some()
            || self.text.is_some()
            || self.source_name.is_some()
            || self.source_link.is_some()
            || self.is_published.is_some()
    }
}

/// Pagination parameters for list queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 10,
        }
    }
}

impl ListParams {
    /// Create new pagination parameters
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        ((self.page.saturating_sub(1)) * self.per_page) as i64
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
}

impl<T> PagedResult<T> {
    /// Create a new paginated result
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
        }
    }

    /// Calculate the total number of pages
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 {
            return 0;
        }
        ((self.total as u32) + self.per_page - 1) / self.per_page
    }

    /// Check if the result is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the number of items in the current page
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

impl<T> Default for PagedResult<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: 1,
            per_page: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_time_rounds_up() {
        assert_eq!(estimate_reading_time(""), 0);
        assert_eq!(estimate_reading_time("one two three"), 1);

        let exactly_one_minute = vec!["word"; READING_SPEED_WPM].join(" ");
        assert_eq!(estimate_reading_time(&exactly_one_minute), 1);

        let just_over = vec!["word"; READING_SPEED_WPM + 1].join(" ");
        assert_eq!(estimate_reading_time(&just_over), 2);
    }

    #[test]
    fn test_list_params_clamping() {
        let params = ListParams::new(0, 500);
        assert_eq!(params.page, 1);
        assert_eq!(params.per_page, 100);
        assert_eq!(params.offset(), 0);

        let params = ListParams::new(3, 20);
        assert_eq!(params.offset(), 40);
        assert_eq!(params.limit(), 20);
    }

    #[test]
    fn test_paged_result_total_pages() {
        let params = ListParams::new(1, 10);
        let result: PagedResult<i32> = PagedResult::new(vec![1, 2, 3], 25, &params);
        assert_eq!(result.total_pages(), 3);
        assert_eq!(result.len(), 3);
        assert!(!result.is_empty());
    }
}
