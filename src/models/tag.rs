//! Tag model
//!
//! Tags form a directed acyclic graph. Each parent/child edge is stored as a
//! single `TagRelation` row, so both directions of the relation always agree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tag entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    /// Unique identifier
    pub id: i64,
    /// URL-friendly slug (unique)
    pub slug: String,
    /// Display name (unique)
    pub name: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// A parent/child edge in the tag hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagRelation {
    /// Parent tag ID (the broader tag)
    pub parent_id: i64,
    /// Child tag ID (the narrower tag)
    pub child_id: i64,
}

/// Input for creating a new tag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTagInput {
    /// Display name
    pub name: String,
    /// URL-friendly slug (derived from the name when omitted)
    pub slug: Option<String>,
}

impl CreateTagInput {
    /// Resolve the slug, deriving one from the name when not provided.
    pub fn resolve_slug(&self) -> String {
        match &self.slug {
            Some(slug) => slug.clone(),
            None => slugify(&self.name),
        }
    }
}

/// Derive a URL-friendly slug from a display name.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_dash = true;

    for c in name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }

    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Rust"), "rust");
        assert_eq!(slugify("Systems Programming"), "systems-programming");
        assert_eq!(slugify("  C++  &  Rust  "), "c-rust");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn test_resolve_slug_prefers_explicit() {
        let input = CreateTagInput {
            name: "Web Development".to_string(),
            slug: Some("webdev".to_string()),
        };
        assert_eq!(input.resolve_slug(), "webdev");

        let input = CreateTagInput {
            name: "Web Development".to_string(),
            slug: None,
        };
        assert_eq!(input.resolve_slug(), "web-development");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(50))]

            /// Slugs never start or end with a dash and never contain
            /// consecutive dashes or uppercase letters.
            #[test]
            fn slugify_output_is_normalized(name in ".{0,40}") {
                let slug = slugify(&name);
                prop_assert!(!slug.starts_with('-'));
                prop_assert!(!slug.ends_with('-'));
                prop_assert!(!slug.contains("--"));
                prop_assert!(slug.chars().all(|c| c == '-' || !c.is_uppercase()));
            }

            /// Slugifying an existing slug changes nothing.
            #[test]
            fn slugify_is_idempotent(name in "[a-zA-Z0-9 ]{0,40}") {
                let once = slugify(&name);
                prop_assert_eq!(slugify(&once), once.clone());
            }
        }
    }
}
