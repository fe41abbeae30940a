//! Tag service
//!
//! Business logic for tags and the tag hierarchy:
//! - Tag creation with slug derivation and uniqueness checks
//! - Hierarchy edges with cycle and redundancy rejection
//! - Root listing and subtree queries

use crate::db::repositories::{RelationChange, TagRepository};
use crate::db::tag_graph::EdgeRejection;
use crate::models::{CreateTagInput, Tag, TagRelation};
use anyhow::Context;
use std::sync::Arc;

/// Error types for tag service operations
#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    /// Tag not found
    #[error("Tag not found: {0}")]
    NotFound(String),

    /// A tag with the same name or slug already exists
    #[error("Tag already exists: {0}")]
    AlreadyExists(String),

    /// The two tags are already connected in the hierarchy
    #[error("Tags are already connected: {}", .0.join(", "))]
    AlreadyConnected(Vec<String>),

    /// The proposed edge would make the hierarchy cyclic
    #[error("Relation would create a cycle between: {}", .0.join(", "))]
    HierarchyCycle(Vec<String>),

    /// The edge to remove does not exist
    #[error("No such relation")]
    RelationNotFound,

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Tag service for the tag hierarchy
pub struct TagService {
    repo: Arc<dyn TagRepository>,
}

impl TagService {
    /// Create a new tag service
    pub fn new(repo: Arc<dyn TagRepository>) -> Self {
        Self { repo }
    }

    /// Create a new tag
    ///
    /// # Errors
    /// - `ValidationError` if the name or derived slug is empty
    /// - `AlreadyExists` if a tag with the same slug exists
    pub async fn create(&self, input: CreateTagInput) -> Result<Tag, TagServiceError> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(TagServiceError::ValidationError(
                "Tag name cannot be empty".to_string(),
            ));
        }
        let slug = input.resolve_slug();
        if slug.is_empty() {
            return Err(TagServiceError::ValidationError(
                "Tag slug cannot be empty".to_string(),
            ));
        }

        if self
            .repo
            .get_by_slug(&slug)
            .await
            .context("Failed to check existing tag")?
            .is_some()
        {
            return Err(TagServiceError::AlreadyExists(slug));
        }

        let tag = Tag {
            id: 0,
            slug,
            name,
            created_at: chrono::Utc::now(),
        };
        let created = self
            .repo
            .create(&tag)
            .await
            .context("Failed to create tag")?;

        tracing::info!(tag_id = created.id, slug = %created.slug, "Created tag");
        Ok(created)
    }

    /// Get tag by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Tag>, TagServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get tag by ID")
            .map_err(Into::into)
    }

    /// Get tag by slug
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>, TagServiceError> {
        self.repo
            .get_by_slug(slug)
            .await
            .context("Failed to get tag by slug")
            .map_err(Into::into)
    }

    /// List all tags
    pub async fn list(&self) -> Result<Vec<Tag>, TagServiceError> {
        self.repo
            .list()
            .await
            .context("Failed to list tags")
            .map_err(Into::into)
    }

    /// List root tags (tags without parents)
    pub async fn roots(&self) -> Result<Vec<Tag>, TagServiceError> {
        self.repo
            .list_roots()
            .await
            .context("Failed to list root tags")
            .map_err(Into::into)
    }

    /// Get a tag and all of its descendants
    ///
    /// # Errors
    /// - `NotFound` if the tag does not exist
    pub async fn subtree(&self, id: i64) -> Result<Vec<Tag>, TagServiceError> {
        self.require(id).await?;
        self.repo
            .subtree(id)
            .await
            .context("Failed to load subtree")
            .map_err(Into::into)
    }

    /// List all hierarchy edges
    pub async fn relations(&self) -> Result<Vec<TagRelation>, TagServiceError> {
        self.repo
            .relations()
            .await
            .context("Failed to list relations")
            .map_err(Into::into)
    }

    /// Add a parent/child edge to the hierarchy.
    ///
    /// # Errors
    /// - `NotFound` if either tag does not exist
    /// - `AlreadyConnected` if the tags are already related (including
    ///   self-edges and edges implied by an existing path)
    /// - `HierarchyCycle` if the edge would close a cycle
    pub async fn add_relation(
        &self,
        parent_id: i64,
        child_id: i64,
    ) -> Result<(), TagServiceError> {
        self.require(parent_id).await?;
        if parent_id != child_id {
            self.require(child_id).await?;
        }

        let change = self
            .repo
            .add_relation(parent_id, child_id)
            .await
            .context("Failed to add relation")?;

        match change {
            RelationChange::Applied => {
                tracing::info!(parent_id, child_id, "Added tag relation");
                Ok(())
            }
            RelationChange::Rejected(EdgeRejection::AlreadyConnected(ids)) => {
                Err(TagServiceError::AlreadyConnected(self.names(&ids).await?))
            }
            RelationChange::Rejected(EdgeRejection::WouldCycle(ids)) => {
                Err(TagServiceError::HierarchyCycle(self.names(&ids).await?))
            }
        }
    }

    /// Remove a parent/child edge
    ///
    /// # Errors
    /// - `RelationNotFound` if the edge does not exist
    pub async fn remove_relation(
        &self,
        parent_id: i64,
        child_id: i64,
    ) -> Result<(), TagServiceError> {
        let removed = self
            .repo
            .remove_relation(parent_id, child_id)
            .await
            .context("Failed to remove relation")?;
        if !removed {
            return Err(TagServiceError::RelationNotFound);
        }
        tracing::info!(parent_id, child_id, "Removed tag relation");
        Ok(())
    }

    /// Delete a tag. Edges and article attachments cascade.
    pub async fn delete(&self, id: i64) -> Result<(), TagServiceError> {
        self.require(id).await?;
        self.repo.delete(id).await.context("Failed to delete tag")?;
        tracing::info!(tag_id = id, "Deleted tag");
        Ok(())
    }

    async fn require(&self, id: i64) -> Result<Tag, TagServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to look up tag")?
            .ok_or_else(|| TagServiceError::NotFound(id.to_string()))
    }

    /// Map tag IDs to display names for error messages, falling back to the
    /// raw ID when a tag vanished mid-flight.
    async fn names(&self, ids: &[i64]) -> Result<Vec<String>, TagServiceError> {
        let tags = self
            .repo
            .get_by_ids(ids)
            .await
            .context("Failed to resolve tag names")?;
        let mut names = Vec::with_capacity(ids.len());
        for &id in ids {
            match tags.iter().find(|t| t.id == id) {
                Some(tag) => names.push(tag.name.clone()),
                None => names.push(id.to_string()),
            }
        }
        Ok(names)
    }
}
