//! Keyword and post/keyword junction model.
//!
//! # Invariants
//! - `Keyword::text` is already normalized by [`normalize_keyword`].
//! - A `(post_id, keyword_id)` pair appears at most once.

use crate::model::post::PostId;
use serde::{Deserialize, Serialize};

/// Storage-assigned keyword identifier.
pub type KeywordId = i64;

/// Shared tag attached to zero or more posts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Keyword {
    pub id: KeywordId,
    /// Normalized text, unique across the store.
    pub text: String,
}

/// Junction row linking one post to one keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostKeyword {
    pub post_id: PostId,
    pub keyword_id: KeywordId,
}

/// Normalizes keyword text: trim, then lowercase.
///
/// Returns `None` when nothing is left after trimming.
pub fn normalize_keyword(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Splits a comma-separated keyword string into raw tokens.
///
/// Tokens keep surrounding whitespace and empty tokens are preserved; the
/// keyword store owns normalization and rejects blanks.
pub fn split_keyword_string(keyword_string: &str) -> Vec<&str> {
    keyword_string.split(',').collect()
}
