//! Redakt - a content publication platform backend
//!
//! This library provides the core functionality for the Redakt platform:
//! articles, hierarchical tags, votes, favorites and comments.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
