//! Post search use-case service.
//!
//! # Responsibility
//! - Filter posts by keyword-string containment and by author name.
//! - Serve the listing extras: posts by author id, the latest posts, and the
//!   title/keyword text search.
//! - Provide the never-failing listing envelope used by index pages.
//!
//! # Invariants
//! - Keyword matching asks "does the search string contain the keyword",
//!   case-sensitively, against the raw search string: `"I love cats"` finds
//!   keyword `cats`, `"cat"` does not.
//! - Author matching is case-sensitive substring containment.
//! - With both filters, an empty keyword result falls back to filtering the
//!   full post collection by author.
//! - A filter counts as provided only when it is non-blank.

use crate::logging::sanitize_message;
use crate::model::keyword::KeywordId;
use crate::model::post::{Post, UserId};
use crate::repo::post_keyword_repo::{PostKeywordRepository, SqlitePostKeywordRepository};
use crate::repo::post_repo::{PostRepository, SqlitePostRepository};
use crate::repo::RepoError;
use log::{debug, warn};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

const MAX_MESSAGE_CHARS: usize = 200;

/// Posts shown in the "latest" strip of index pages.
pub const RECENT_POST_LIMIT: usize = 10;

/// Service error for post search.
#[derive(Debug)]
pub enum SearchServiceError {
    Repo(RepoError),
}

impl Display for SearchServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "post search failed: {err}"),
        }
    }
}

impl Error for SearchServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for SearchServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Optional filters from the listing workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostSearchQuery {
    /// Free text checked for contained keywords.
    pub keyword_string: Option<String>,
    /// Author display-name fragment.
    pub author_name: Option<String>,
}

/// Listing envelope; `ok=false` carries an empty list and a message.
#[derive(Debug, Clone, PartialEq)]
pub struct PostSearchResponse {
    pub items: Vec<Post>,
    pub ok: bool,
    pub message: String,
}

/// Post search over one borrowed session.
pub struct SearchService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SearchService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Returns posts linked to any keyword contained in `keyword_string`.
    pub fn find_by_keyword_string(
        &self,
        keyword_string: &str,
    ) -> Result<Vec<Post>, SearchServiceError> {
        let posts =
            SqlitePostRepository::new(self.conn).list_posts_by_keyword_string(keyword_string)?;
        Ok(posts)
    }

    /// Returns posts linked to any of `keyword_ids`, each post once.
    pub fn posts_by_keyword_ids(
        &self,
        keyword_ids: &[KeywordId],
    ) -> Result<Vec<Post>, SearchServiceError> {
        let post_ids =
            SqlitePostKeywordRepository::new(self.conn).post_ids_by_keyword_ids(keyword_ids)?;
        Ok(SqlitePostRepository::new(self.conn).list_posts_by_ids(&post_ids)?)
    }

    /// Returns posts written by the author with `user_id`.
    pub fn posts_by_author_id(&self, user_id: UserId) -> Result<Vec<Post>, SearchServiceError> {
        Ok(SqlitePostRepository::new(self.conn).list_posts_by_author_id(user_id)?)
    }

    /// Returns the [`RECENT_POST_LIMIT`] newest posts.
    pub fn recent_posts(&self) -> Result<Vec<Post>, SearchServiceError> {
        Ok(SqlitePostRepository::new(self.conn).list_recent_posts(RECENT_POST_LIMIT)?)
    }

    /// Free-text lookup: posts whose title or any linked keyword contains
    /// `search`. Blank `search` returns all posts.
    pub fn find(&self, search: &str) -> Result<Vec<Post>, SearchServiceError> {
        let posts = SqlitePostRepository::new(self.conn);
        let result = match provided(Some(search)) {
            Some(search) => posts.list_posts_by_title_or_keyword_substring(search)?,
            None => posts.list_posts()?,
        };
        Ok(result)
    }

    /// Combines keyword and author filters.
    ///
    /// | keyword | author | result                                         |
    /// |---------|--------|------------------------------------------------|
    /// | -       | -      | all posts                                      |
    /// | yes     | -      | keyword matches                                |
    /// | -       | yes    | author matches (storage query)                 |
    /// | yes     | yes    | keyword matches by author, or all posts by     |
    /// |         |        | author when no keyword matched                 |
    pub fn search(
        &self,
        keyword_string: Option<&str>,
        author_fragment: Option<&str>,
    ) -> Result<Vec<Post>, SearchServiceError> {
        let keyword_string = provided(keyword_string);
        let author_fragment = provided(author_fragment);
        let posts = SqlitePostRepository::new(self.conn);

        let result = match (keyword_string, author_fragment) {
            (None, None) => posts.list_posts()?,
            (Some(keywords), None) => self.find_by_keyword_string(keywords)?,
            (None, Some(author)) => posts.list_posts_by_author_substring(author)?,
            (Some(keywords), Some(author)) => {
                let keyword_hits = self.find_by_keyword_string(keywords)?;
                if keyword_hits.is_empty() {
                    debug!("event=post_search module=service status=fallback reason=no_keyword_hits");
                    filter_by_author_substring(posts.list_posts()?, author)
                } else {
                    filter_by_author_substring(keyword_hits, author)
                }
            }
        };

        debug!(
            "event=post_search module=service status=ok keyword_filter={} author_filter={} hits={}",
            keyword_string.is_some(),
            author_fragment.is_some(),
            result.len()
        );
        Ok(result)
    }
}

/// Keeps posts whose author name contains `fragment` (case-sensitive).
pub fn filter_by_author_substring(posts: Vec<Post>, fragment: &str) -> Vec<Post> {
    posts
        .into_iter()
        .filter(|post| post.author.name.contains(fragment))
        .collect()
}

/// Runs [`SearchService::search`] and folds failures into the envelope.
///
/// Never fails: a storage error yields an empty item list, `ok=false`, and a
/// single-line message.
pub fn search_posts_or_empty(conn: &Connection, query: &PostSearchQuery) -> PostSearchResponse {
    let service = SearchService::new(conn);
    match service.search(query.keyword_string.as_deref(), query.author_name.as_deref()) {
        Ok(items) => {
            let message = match items.len() {
                0 => "No posts found.".to_string(),
                1 => "Found 1 post.".to_string(),
                count => format!("Found {count} posts."),
            };
            PostSearchResponse {
                items,
                ok: true,
                message,
            }
        }
        Err(err) => {
            warn!("event=post_search module=service status=error error={err}");
            PostSearchResponse {
                items: Vec::new(),
                ok: false,
                message: sanitize_message(&err.to_string(), MAX_MESSAGE_CHARS),
            }
        }
    }
}

fn provided(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::{filter_by_author_substring, provided};
    use crate::model::post::{Post, User};

    fn post(id: i64, author: &str) -> Post {
        Post {
            id,
            author: User {
                id,
                name: author.to_string(),
            },
            title: format!("post {id}"),
            content: "body text".to_string(),
            summary: None,
            image_href: None,
            sentiment: None,
            created_at: 0,
        }
    }

    #[test]
    fn author_filter_is_case_sensitive_substring() {
        let posts = vec![post(1, "Bob"), post(2, "Doug"), post(3, "Bobby"), post(4, "bob")];
        let ids: Vec<_> = filter_by_author_substring(posts, "Bob")
            .into_iter()
            .map(|post| post.id)
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn blank_filters_are_not_provided() {
        assert_eq!(provided(None), None);
        assert_eq!(provided(Some("  ")), None);
        assert_eq!(provided(Some(" cats ")), Some(" cats "));
    }
}
