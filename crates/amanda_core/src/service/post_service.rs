//! Post creation use-case service.
//!
//! # Responsibility
//! - Validate new-post requests and persist the post with its author.
//! - Run optional enrichment, then merge explicit and suggested keywords.
//!
//! # Invariants
//! - The post is committed before any follow-up step runs.
//! - Enrichment and keyword-merge failures never remove the post; they are
//!   logged and handed back to the caller in [`CreatedPost::follow_up_errors`].

use crate::model::keyword::Keyword;
use crate::model::post::{NewPost, Post, PostId, PostValidationError};
use crate::repo::keyword_repo::{KeywordRepository, SqliteKeywordRepository};
use crate::repo::post_repo::{PostRepository, SqlitePostRepository};
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use crate::repo::{RepoError, RepoResult};
use crate::service::enrichment::{EnrichmentError, PostEnricher};
use crate::service::keyword_service::{KeywordService, KeywordServiceError, MergeReport};
use log::{info, warn};
use rusqlite::{Connection, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for post creation.
#[derive(Debug)]
pub enum PostServiceError {
    Validation(PostValidationError),
    /// Post missing in read-back right after a successful write.
    InconsistentState(&'static str),
    Repo(RepoError),
}

impl Display for PostServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent post state: {details}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PostServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::InconsistentState(_) => None,
        }
    }
}

impl From<PostValidationError> for PostServiceError {
    fn from(value: PostValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for PostServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for PostServiceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

/// Failure of a step that runs after the post is committed.
#[derive(Debug)]
pub enum FollowUpError {
    Enrichment(EnrichmentError),
    /// Enrichment succeeded but writing its fields failed.
    EnrichmentPersist(RepoError),
    KeywordMerge(KeywordServiceError),
}

impl Display for FollowUpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Enrichment(err) => write!(f, "{err}"),
            Self::EnrichmentPersist(err) => write!(f, "failed to store enrichment: {err}"),
            Self::KeywordMerge(err) => write!(f, "keyword merge failed: {err}"),
        }
    }
}

impl Error for FollowUpError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Enrichment(err) => Some(err),
            Self::EnrichmentPersist(err) => Some(err),
            Self::KeywordMerge(err) => Some(err),
        }
    }
}

/// Post with the keywords linked to it.
#[derive(Debug, Clone, PartialEq)]
pub struct PostDetail {
    pub post: Post,
    pub keywords: Vec<Keyword>,
}

/// Result of [`PostService::create_post`].
#[derive(Debug)]
pub struct CreatedPost {
    pub detail: PostDetail,
    /// Present when a keyword merge ran successfully.
    pub merge: Option<MergeReport>,
    pub follow_up_errors: Vec<FollowUpError>,
}

/// Post service over one borrowed session.
pub struct PostService<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> PostService<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }

    /// Creates one post, then enriches it and merges its keywords.
    ///
    /// `enricher` is consulted only when `request.enrich` is set.
    ///
    /// # Errors
    /// - `Validation` when the request breaks form rules; nothing is stored.
    /// - `Repo` when the author or post cannot be stored.
    ///
    /// Follow-up failures do not produce `Err`.
    pub fn create_post(
        &mut self,
        request: &NewPost,
        enricher: Option<&dyn PostEnricher>,
    ) -> Result<CreatedPost, PostServiceError> {
        request.validate()?;

        let post_id = self.insert_post(request)?;
        info!("event=post_create module=service status=ok post_id={post_id}");

        let mut follow_up_errors = Vec::new();
        let mut suggested_keywords = Vec::new();

        if let (true, Some(enricher)) = (request.enrich, enricher) {
            match enricher.enrich(&request.content) {
                Ok(enrichment) => {
                    suggested_keywords = enrichment.suggested_keywords();
                    let update = enrichment.to_post_update();
                    if let Err(err) =
                        SqlitePostRepository::new(self.conn).apply_enrichment(post_id, &update)
                    {
                        warn!(
                            "event=post_enrich module=service status=error post_id={post_id} error_code=persist_failed error={err}"
                        );
                        follow_up_errors.push(FollowUpError::EnrichmentPersist(err));
                    }
                }
                Err(err) => {
                    warn!(
                        "event=post_enrich module=service status=error post_id={post_id} error_code=enricher_failed error={err}"
                    );
                    follow_up_errors.push(FollowUpError::Enrichment(err));
                }
            }
        }

        let mut merge = None;
        if let Some(keyword_string) = combined_keyword_string(request, &suggested_keywords) {
            match KeywordService::new(self.conn).merge_keyword_string(&keyword_string, post_id) {
                Ok(report) => merge = Some(report),
                Err(err) => follow_up_errors.push(FollowUpError::KeywordMerge(err)),
            }
        }

        let detail = self
            .get_post_detail(post_id)?
            .ok_or(PostServiceError::InconsistentState(
                "created post not found in read-back",
            ))?;

        Ok(CreatedPost {
            detail,
            merge,
            follow_up_errors,
        })
    }

    /// Merges keywords into an existing post, e.g. after an edit.
    pub fn merge_keywords(
        &mut self,
        post_id: PostId,
        keyword_string: &str,
    ) -> Result<MergeReport, KeywordServiceError> {
        KeywordService::new(self.conn).merge_keyword_string(keyword_string, post_id)
    }

    /// Gets one post with its keywords.
    pub fn get_post_detail(&self, post_id: PostId) -> RepoResult<Option<PostDetail>> {
        let Some(post) = SqlitePostRepository::new(self.conn).get_post(post_id)? else {
            return Ok(None);
        };
        let keywords = SqliteKeywordRepository::new(self.conn).keywords_for_post(post_id)?;
        Ok(Some(PostDetail { post, keywords }))
    }

    fn insert_post(&mut self, request: &NewPost) -> Result<PostId, PostServiceError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let post_id = {
            let author = SqliteUserRepository::new(&tx).get_or_create_user(&request.user_name)?;
            SqlitePostRepository::new(&tx).create_post(
                author.id,
                request.title.trim(),
                &request.content,
            )?
        };
        tx.commit()?;
        Ok(post_id)
    }
}

/// Joins the request's keyword string with suggested keywords.
fn combined_keyword_string(request: &NewPost, suggested: &[String]) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    if let Some(explicit) = request.keyword_string() {
        parts.push(explicit);
    }
    parts.extend(suggested.iter().map(String::as_str));

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::combined_keyword_string;
    use crate::model::post::NewPost;

    #[test]
    fn combined_keywords_append_suggestions() {
        let request = NewPost::new("Bob", "Cats", "All about cats").with_keywords("cats, pets");
        let combined = combined_keyword_string(&request, &["felines".to_string()]);
        assert_eq!(combined.as_deref(), Some("cats, pets,felines"));
    }

    #[test]
    fn no_keywords_and_no_suggestions_skip_merge() {
        let request = NewPost::new("Bob", "Cats", "All about cats").with_keywords(" ");
        assert_eq!(combined_keyword_string(&request, &[]), None);
    }
}
