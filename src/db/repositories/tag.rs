//! Tag repository
//!
//! Database operations for tags and the tag hierarchy.
//!
//! This module provides:
//! - `TagRepository` trait defining the interface for tag data access
//! - `SqlxTagRepository` implementing the trait for SQLite and MySQL
//!
//! Hierarchy mutations (adding edges, attaching and detaching article tags)
//! run inside a transaction: the full edge set is loaded, the change is
//! planned by [`TagGraph`](crate::db::tag_graph::TagGraph), and the writes
//! are applied before committing.

use crate::config::DatabaseDriver;
use crate::db::tag_graph::{EdgeRejection, TagGraph};
use crate::db::DbHandle;
use crate::models::{Tag, TagRelation};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::collections::HashSet;
use std::sync::Arc;

/// Outcome of a hierarchy edge mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationChange {
    /// The edge was added or removed
    Applied,
    /// The edge was rejected; contains the rejection reason
    Rejected(EdgeRejection),
}

/// Tag repository trait
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Create a new tag
    async fn create(&self, tag: &Tag) -> Result<Tag>;

    /// Get tag by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>>;

    /// Get tag by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>>;

    /// Get several tags by ID
    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Tag>>;

    /// List all tags ordered by name
    async fn list(&self) -> Result<Vec<Tag>>;

    /// List root tags (tags without parents)
    async fn list_roots(&self) -> Result<Vec<Tag>>;

    /// List a tag and all of its descendants
    async fn subtree(&self, id: i64) -> Result<Vec<Tag>>;

    /// Load the full hierarchy edge set
    async fn relations(&self) -> Result<Vec<TagRelation>>;

    /// Add a parent/child edge, validating the hierarchy stays acyclic
    /// and redundancy-free
    async fn add_relation(&self, parent_id: i64, child_id: i64) -> Result<RelationChange>;

    /// Remove a parent/child edge. Returns false if the edge did not exist.
    async fn remove_relation(&self, parent_id: i64, child_id: i64) -> Result<bool>;

    /// Delete a tag
    async fn delete(&self, id: i64) -> Result<()>;

    /// Attach tags to an article, propagating to all ancestor tags.
    /// Returns the full set of tag IDs that ended up attached.
    async fn attach_to_article(&self, article_id: i64, tag_ids: &[i64]) -> Result<Vec<i64>>;

    /// Detach tags from an article, removing attached descendants that would
    /// otherwise imply the removed tags. Returns the removed tag IDs.
    async fn detach_from_article(&self, article_id: i64, tag_ids: &[i64]) -> Result<Vec<i64>>;

    /// Get tags attached to an article
    async fn get_by_article_id(&self, article_id: i64) -> Result<Vec<Tag>>;
}

/// SQLx-based tag repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxTagRepository {
    pool: DbHandle,
}

impl SqlxTagRepository {
    /// Create a new SQLx tag repository
    pub fn new(pool: DbHandle) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DbHandle) -> Arc<dyn TagRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TagRepository for SqlxTagRepository {
    async fn create(&self, tag: &Tag) -> Result<Tag> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_tag_sqlite(self.pool.as_sqlite().unwrap(), tag).await,
            DatabaseDriver::Mysql => create_tag_mysql(self.pool.as_mysql().unwrap(), tag).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Tag>> {
        let sql = "SELECT id, slug, name, created_at FROM tags WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get tag by ID")?;
                row.map(|r| row_to_tag_sqlite(&r)).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .fetch_optional(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get tag by ID")?;
                row.map(|r| row_to_tag_mysql(&r)).transpose()
            }
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Tag>> {
        let sql = "SELECT id, slug, name, created_at FROM tags WHERE slug = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(sql)
                    .bind(slug)
                    .fetch_optional(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get tag by slug")?;
                row.map(|r| row_to_tag_sqlite(&r)).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(sql)
                    .bind(slug)
                    .fetch_optional(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get tag by slug")?;
                row.map(|r| row_to_tag_mysql(&r)).transpose()
            }
        }
    }

    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Tag>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT id, slug, name, created_at FROM tags WHERE id IN ({}) ORDER BY name",
            placeholders
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut query = sqlx::query(&sql);
                for id in ids {
                    query = query.bind(id);
                }
                let rows = query
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get tags by IDs")?;
                rows.iter().map(row_to_tag_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let mut query = sqlx::query(&sql);
                for id in ids {
                    query = query.bind(id);
                }
                let rows = query
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get tags by IDs")?;
                rows.iter().map(row_to_tag_mysql).collect()
            }
        }
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        let sql = "SELECT id, slug, name, created_at FROM tags ORDER BY name";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(sql)
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to list tags")?;
                rows.iter().map(row_to_tag_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(sql)
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to list tags")?;
                rows.iter().map(row_to_tag_mysql).collect()
            }
        }
    }

    async fn list_roots(&self) -> Result<Vec<Tag>> {
        let sql = r#"
            SELECT t.id, t.slug, t.name, t.created_at
            FROM tags t
            WHERE NOT EXISTS (
                SELECT 1 FROM tag_relations tr WHERE tr.child_id = t.id
            )
            ORDER BY t.name
        "#;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(sql)
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to list root tags")?;
                rows.iter().map(row_to_tag_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(sql)
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to list root tags")?;
                rows.iter().map(row_to_tag_mysql).collect()
            }
        }
    }

    async fn subtree(&self, id: i64) -> Result<Vec<Tag>> {
        let sql = r#"
            WITH RECURSIVE subtree(id) AS (
                SELECT ?
                UNION
                SELECT tr.child_id
                FROM tag_relations tr
                JOIN subtree s ON tr.parent_id = s.id
            )
            SELECT t.id, t.slug, t.name, t.created_at
            FROM tags t
            JOIN subtree s ON t.id = s.id
            ORDER BY t.name
        "#;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(sql)
                    .bind(id)
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to load tag subtree")?;
                rows.iter().map(row_to_tag_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(sql)
                    .bind(id)
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to load tag subtree")?;
                rows.iter().map(row_to_tag_mysql).collect()
            }
        }
    }

    async fn relations(&self) -> Result<Vec<TagRelation>> {
        let sql = "SELECT parent_id, child_id FROM tag_relations";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(sql)
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to load tag relations")?;
                Ok(rows
                    .iter()
                    .map(|r| TagRelation {
                        parent_id: r.get("parent_id"),
                        child_id: r.get("child_id"),
                    })
                    .collect())
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(sql)
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to load tag relations")?;
                Ok(rows
                    .iter()
                    .map(|r| TagRelation {
                        parent_id: r.get("parent_id"),
                        child_id: r.get("child_id"),
                    })
                    .collect())
            }
        }
    }

    async fn add_relation(&self, parent_id: i64, child_id: i64) -> Result<RelationChange> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                add_relation_sqlite(self.pool.as_sqlite().unwrap(), parent_id, child_id).await
            }
            DatabaseDriver::Mysql => {
                add_relation_mysql(self.pool.as_mysql().unwrap(), parent_id, child_id).await
            }
        }
    }

    async fn remove_relation(&self, parent_id: i64, child_id: i64) -> Result<bool> {
        let sql = "DELETE FROM tag_relations WHERE parent_id = ? AND child_id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(parent_id)
                .bind(child_id)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to remove tag relation")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(parent_id)
                .bind(child_id)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to remove tag relation")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        // Relations and article attachments cascade
        let sql = "DELETE FROM tags WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to delete tag")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to delete tag")?;
            }
        }
        Ok(())
    }

    async fn attach_to_article(&self, article_id: i64, tag_ids: &[i64]) -> Result<Vec<i64>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                attach_tags_sqlite(self.pool.as_sqlite().unwrap(), article_id, tag_ids).await
            }
            DatabaseDriver::Mysql => {
                attach_tags_mysql(self.pool.as_mysql().unwrap(), article_id, tag_ids).await
            }
        }
    }

    async fn detach_from_article(&self, article_id: i64, tag_ids: &[i64]) -> Result<Vec<i64>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                detach_tags_sqlite(self.pool.as_sqlite().unwrap(), article_id, tag_ids).await
            }
            DatabaseDriver::Mysql => {
                detach_tags_mysql(self.pool.as_mysql().unwrap(), article_id, tag_ids).await
            }
        }
    }

    async fn get_by_article_id(&self, article_id: i64) -> Result<Vec<Tag>> {
        let sql = r#"
            SELECT t.id, t.slug, t.name, t.created_at
            FROM tags t
            JOIN article_tags at ON t.id = at.tag_id
            WHERE at.article_id = ?
            ORDER BY t.name
        "#;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(sql)
                    .bind(article_id)
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get article tags")?;
                rows.iter().map(row_to_tag_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(sql)
                    .bind(article_id)
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get article tags")?;
                rows.iter().map(row_to_tag_mysql).collect()
            }
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_tag_sqlite(pool: &SqlitePool, tag: &Tag) -> Result<Tag> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO tags (slug, name, created_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&tag.slug)
    .bind(&tag.name)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create tag")?;

    Ok(Tag {
        id: result.last_insert_rowid(),
        slug: tag.slug.clone(),
        name: tag.name.clone(),
        created_at: now,
    })
}

async fn add_relation_sqlite(
    pool: &SqlitePool,
    parent_id: i64,
    child_id: i64,
) -> Result<RelationChange> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let rows = sqlx::query("SELECT parent_id, child_id FROM tag_relations")
        .fetch_all(&mut *tx)
        .await
        .context("Failed to load tag relations")?;
    let relations: Vec<TagRelation> = rows
        .iter()
        .map(|r| TagRelation {
            parent_id: r.get("parent_id"),
            child_id: r.get("child_id"),
        })
        .collect();

    let graph = TagGraph::new(&relations);
    if let Err(rejection) = graph.check_new_edge(parent_id, child_id) {
        return Ok(RelationChange::Rejected(rejection));
    }

    sqlx::query("INSERT INTO tag_relations (parent_id, child_id) VALUES (?, ?)")
        .bind(parent_id)
        .bind(child_id)
        .execute(&mut *tx)
        .await
        .context("Failed to insert tag relation")?;

    tx.commit().await.context("Failed to commit transaction")?;
    Ok(RelationChange::Applied)
}

async fn attach_tags_sqlite(
    pool: &SqlitePool,
    article_id: i64,
    tag_ids: &[i64],
) -> Result<Vec<i64>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let rows = sqlx::query("SELECT parent_id, child_id FROM tag_relations")
        .fetch_all(&mut *tx)
        .await
        .context("Failed to load tag relations")?;
    let relations: Vec<TagRelation> = rows
        .iter()
        .map(|r| TagRelation {
            parent_id: r.get("parent_id"),
            child_id: r.get("child_id"),
        })
        .collect();

    let graph = TagGraph::new(&relations);
    let mut expanded: Vec<i64> = graph.expand_attachment(tag_ids).into_iter().collect();
    expanded.sort_unstable();

    for &tag_id in &expanded {
        sqlx::query("INSERT OR IGNORE INTO article_tags (article_id, tag_id) VALUES (?, ?)")
            .bind(article_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to attach tag to article")?;
    }

    tx.commit().await.context("Failed to commit transaction")?;
    Ok(expanded)
}

async fn detach_tags_sqlite(
    pool: &SqlitePool,
    article_id: i64,
    tag_ids: &[i64],
) -> Result<Vec<i64>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let rows = sqlx::query("SELECT parent_id, child_id FROM tag_relations")
        .fetch_all(&mut *tx)
        .await
        .context("Failed to load tag relations")?;
    let relations: Vec<TagRelation> = rows
        .iter()
        .map(|r| TagRelation {
            parent_id: r.get("parent_id"),
            child_id: r.get("child_id"),
        })
        .collect();

    let current_rows = sqlx::query("SELECT tag_id FROM article_tags WHERE article_id = ?")
        .bind(article_id)
        .fetch_all(&mut *tx)
        .await
        .context("Failed to load article tags")?;
    let current: HashSet<i64> = current_rows.iter().map(|r| r.get("tag_id")).collect();

    let graph = TagGraph::new(&relations);
    let mut removed: Vec<i64> = graph
        .plan_detachment(&current, tag_ids)
        .into_iter()
        .collect();
    removed.sort_unstable();

    for &tag_id in &removed {
        sqlx::query("DELETE FROM article_tags WHERE article_id = ? AND tag_id = ?")
            .bind(article_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to detach tag from article")?;
    }

    tx.commit().await.context("Failed to commit transaction")?;
    Ok(removed)
}

fn row_to_tag_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Tag> {
    Ok(Tag {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_tag_mysql(pool: &MySqlPool, tag: &Tag) -> Result<Tag> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO tags (slug, name, created_at)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&tag.slug)
    .bind(&tag.name)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create tag")?;

    Ok(Tag {
        id: result.last_insert_id() as i64,
        slug: tag.slug.clone(),
        name: tag.name.clone(),
        created_at: now,
    })
}

async fn add_relation_mysql(
    pool: &MySqlPool,
    parent_id: i64,
    child_id: i64,
) -> Result<RelationChange> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let rows = sqlx::query("SELECT parent_id, child_id FROM tag_relations FOR UPDATE")
        .fetch_all(&mut *tx)
        .await
        .context("Failed to load tag relations")?;
    let relations: Vec<TagRelation> = rows
        .iter()
        .map(|r| TagRelation {
            parent_id: r.get("parent_id"),
            child_id: r.get("child_id"),
        })
        .collect();

    let graph = TagGraph::new(&relations);
    if let Err(rejection) = graph.check_new_edge(parent_id, child_id) {
        return Ok(RelationChange::Rejected(rejection));
    }

    sqlx::query("INSERT INTO tag_relations (parent_id, child_id) VALUES (?, ?)")
        .bind(parent_id)
        .bind(child_id)
        .execute(&mut *tx)
        .await
        .context("Failed to insert tag relation")?;

    tx.commit().await.context("Failed to commit transaction")?;
    Ok(RelationChange::Applied)
}

async fn attach_tags_mysql(pool: &MySqlPool, article_id: i64, tag_ids: &[i64]) -> Result<Vec<i64>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let rows = sqlx::query("SELECT parent_id, child_id FROM tag_relations")
        .fetch_all(&mut *tx)
        .await
        .context("Failed to load tag relations")?;
    let relations: Vec<TagRelation> = rows
        .iter()
        .map(|r| TagRelation {
            parent_id: r.get("parent_id"),
            child_id: r.get("child_id"),
        })
        .collect();

    let graph = TagGraph::new(&relations);
    let mut expanded: Vec<i64> = graph.expand_attachment(tag_ids).into_iter().collect();
    expanded.sort_unstable();

    for &tag_id in &expanded {
        sqlx::query("INSERT IGNORE INTO article_tags (article_id, tag_id) VALUES (?, ?)")
            .bind(article_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to attach tag to article")?;
    }

    tx.commit().await.context("Failed to commit transaction")?;
    Ok(expanded)
}

async fn detach_tags_mysql(pool: &MySqlPool, article_id: i64, tag_ids: &[i64]) -> Result<Vec<i64>> {
    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    let rows = sqlx::query("SELECT parent_id, child_id FROM tag_relations")
        .fetch_all(&mut *tx)
        .await
        .context("Failed to load tag relations")?;
    let relations: Vec<TagRelation> = rows
        .iter()
        .map(|r| TagRelation {
            parent_id: r.get("parent_id"),
            child_id: r.get("child_id"),
        })
        .collect();

    let current_rows = sqlx::query("SELECT tag_id FROM article_tags WHERE article_id = ? FOR UPDATE")
        .bind(article_id)
        .fetch_all(&mut *tx)
        .await
        .context("Failed to load article tags")?;
    let current: HashSet<i64> = current_rows.iter().map(|r| r.get("tag_id")).collect();

    let graph = TagGraph::new(&relations);
    let mut removed: Vec<i64> = graph
        .plan_detachment(&current, tag_ids)
        .into_iter()
        .collect();
    removed.sort_unstable();

    for &tag_id in &removed {
        sqlx::query("DELETE FROM article_tags WHERE article_id = ? AND tag_id = ?")
            .bind(article_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("Failed to detach tag from article")?;
    }

    tx.commit().await.context("Failed to commit transaction")?;
    Ok(removed)
}

fn row_to_tag_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Tag> {
    Ok(Tag {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    })
}
