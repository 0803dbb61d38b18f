//! Author and post model plus new-post validation.
//!
//! # Invariants
//! - A post always has exactly one author.
//! - `NewPost::validate()` must pass before a post is persisted.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type PostId = i64;
pub type UserId = i64;

const USER_NAME_MIN_CHARS: usize = 3;
const TITLE_MIN_WORD_CHARS: usize = 3;
const CONTENT_MIN_CHARS: usize = 10;

static WORD_CHAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w").expect("valid word regex"));

/// Post author, identified by display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Display name; unique and matched case-sensitively by search.
    pub name: String,
}

/// Post read model with its author attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author: User,
    pub title: String,
    /// Body shown in listings.
    pub content: String,
    /// Enrichment summary, if the post was enriched.
    pub summary: Option<String>,
    /// First enrichment image href.
    pub image_href: Option<String>,
    /// Enrichment sentiment score.
    pub sentiment: Option<f64>,
    /// Creation timestamp in epoch milliseconds.
    pub created_at: i64,
}

/// Request to create one post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    /// Author display name; the author is created on first use.
    pub user_name: String,
    pub title: String,
    pub content: String,
    /// Optional comma-separated keyword string merged after creation.
    pub keywords: Option<String>,
    /// Whether to run the enrichment collaborator after creation.
    pub enrich: bool,
}

/// Field-level validation failure for [`NewPost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostValidationError {
    UserNameTooShort,
    /// Title needs at least three word characters.
    TitleTooShort,
    ContentTooShort,
}

impl Display for PostValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UserNameTooShort => write!(
                f,
                "user name must be at least {USER_NAME_MIN_CHARS} characters"
            ),
            Self::TitleTooShort => write!(
                f,
                "title must contain at least {TITLE_MIN_WORD_CHARS} non-whitespace characters"
            ),
            Self::ContentTooShort => write!(
                f,
                "post content must be at least {CONTENT_MIN_CHARS} characters"
            ),
        }
    }
}

impl Error for PostValidationError {}

impl NewPost {
    pub fn new(
        user_name: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            user_name: user_name.into(),
            title: title.into(),
            content: content.into(),
            keywords: None,
            enrich: false,
        }
    }

    /// Sets the comma-separated keyword string.
    pub fn with_keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = Some(keywords.into());
        self
    }

    /// Validates form-level constraints before persistence.
    pub fn validate(&self) -> Result<(), PostValidationError> {
        // Authors are stored trimmed; the minimum applies to the stored name.
        if self.user_name.trim().chars().count() < USER_NAME_MIN_CHARS {
            return Err(PostValidationError::UserNameTooShort);
        }
        if WORD_CHAR_RE.find_iter(&self.title).count() < TITLE_MIN_WORD_CHARS {
            return Err(PostValidationError::TitleTooShort);
        }
        if self.content.chars().count() < CONTENT_MIN_CHARS {
            return Err(PostValidationError::ContentTooShort);
        }
        Ok(())
    }

    /// Returns the keyword string when it holds anything besides whitespace.
    pub fn keyword_string(&self) -> Option<&str> {
        self.keywords
            .as_deref()
            .filter(|value| !value.trim().is_empty())
    }
}
