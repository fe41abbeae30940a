//! Database layer
//!
//! This module provides database abstraction for the Redakt platform.
//! It supports:
//! - SQLite (default, for single-binary deployment)
//! - MySQL (for larger deployments)
//!
//! The database driver is selected based on configuration.
//!
//! # Architecture
//!
//! A `Database` enum wraps whichever sqlx pool the configuration selects,
//! so the rest of the crate holds one `DbHandle` without knowing the
//! backend. Repositories dispatch on the driver and carry per-driver SQL.

pub mod migrations;
pub mod pool;
pub mod repositories;
pub mod tag_graph;

pub use pool::{create_pool, create_test_pool, Database, DbHandle};
