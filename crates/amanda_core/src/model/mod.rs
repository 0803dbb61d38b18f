//! Blog domain model.
//!
//! # Responsibility
//! - Define authors, posts, keywords and the post/keyword junction.
//! - Own keyword text normalization and new-post validation rules.
//!
//! # Invariants
//! - Every entity is identified by a storage-assigned integer id.
//! - Keyword text is stored normalized (trimmed, lowercase).

pub mod keyword;
pub mod post;
