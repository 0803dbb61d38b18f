//! Keyword merge use-case service.
//!
//! # Responsibility
//! - Merge a comma-separated keyword string into one post.
//! - Drive the keyword store and the post/keyword linker in two phases.
//!
//! # Invariants
//! - Phase 1 upserts every token's keyword and commits once.
//! - Phase 2 links every collected keyword to the post and commits once.
//! - Between the phases keywords are durable and links are not; a phase-2
//!   failure leaves keywords without links, which is harmless because
//!   keywords are shared across posts.
//! - Re-merging the same string is a no-op after the first success.

use crate::model::keyword::{split_keyword_string, Keyword, KeywordId, PostKeyword};
use crate::model::post::PostId;
use crate::repo::keyword_repo::{KeywordRepository, SqliteKeywordRepository};
use crate::repo::post_keyword_repo::{PostKeywordRepository, SqlitePostKeywordRepository};
use crate::repo::{RepoError, RepoResult};
use log::{info, warn};
use rusqlite::{Connection, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Service error for keyword merge use-cases.
#[derive(Debug)]
pub enum KeywordServiceError {
    /// Keyword string, or one of its tokens, is blank.
    InvalidArgument(String),
    /// The linker reported that the post or keyword does not exist.
    LinkTargetMissing {
        post_id: PostId,
        keyword_id: KeywordId,
    },
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for KeywordServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(message) => write!(f, "invalid keyword input: {message}"),
            Self::LinkTargetMissing {
                post_id,
                keyword_id,
            } => write!(
                f,
                "cannot link keyword {keyword_id} to post {post_id}: post or keyword does not exist"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for KeywordServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for KeywordServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::InvalidArgument(message) => Self::InvalidArgument(message),
            other => Self::Repo(other),
        }
    }
}

impl From<rusqlite::Error> for KeywordServiceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

/// What one merge call resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub post_id: PostId,
    /// Distinct keywords in first-seen input order.
    pub keywords: Vec<Keyword>,
    /// Junction rows for `keywords`, existing or new.
    pub links: Vec<PostKeyword>,
    /// Keywords inserted by this call.
    pub created_keywords: usize,
    /// Junction rows inserted by this call.
    pub created_links: usize,
}

/// Keyword service over one borrowed session.
pub struct KeywordService<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> KeywordService<'conn> {
    pub fn new(conn: &'conn mut Connection) -> Self {
        Self { conn }
    }

    /// Ensures every token of `keyword_string` exists as a keyword linked to
    /// `post_id`.
    ///
    /// Tokens are split on `,` and normalized by the keyword store. Empty
    /// tokens (for example from a trailing comma) are rejected, which rolls
    /// back phase 1 for this call.
    ///
    /// # Errors
    /// - `InvalidArgument` when the string or any token is blank.
    /// - `LinkTargetMissing` when `post_id` does not exist; keywords from
    ///   phase 1 stay committed.
    /// - `Repo` on storage failure in either phase.
    pub fn merge_keyword_string(
        &mut self,
        keyword_string: &str,
        post_id: PostId,
    ) -> Result<MergeReport, KeywordServiceError> {
        if keyword_string.trim().is_empty() {
            return Err(KeywordServiceError::InvalidArgument(
                "keyword string must not be blank".to_string(),
            ));
        }

        let started_at = Instant::now();
        let tokens = split_keyword_string(keyword_string);
        info!(
            "event=keyword_merge module=service status=start post_id={post_id} tokens={}",
            tokens.len()
        );

        let result = self
            .upsert_keywords(&tokens)
            .and_then(|(keywords, created_keywords)| {
                self.link_keywords(keywords, created_keywords, post_id)
            });

        match &result {
            Ok(report) => info!(
                "event=keyword_merge module=service status=ok post_id={post_id} keywords={} created_keywords={} created_links={} duration_ms={}",
                report.keywords.len(),
                report.created_keywords,
                report.created_links,
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=keyword_merge module=service status=error post_id={post_id} duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    /// Lists keywords linked to one post, sorted by text.
    pub fn keywords_for_post(&self, post_id: PostId) -> RepoResult<Vec<Keyword>> {
        SqliteKeywordRepository::new(self.conn).keywords_for_post(post_id)
    }

    /// Lists every known keyword, sorted by text.
    pub fn list_keywords(&self) -> RepoResult<Vec<Keyword>> {
        SqliteKeywordRepository::new(self.conn).list_keywords()
    }

    /// Phase 1: upsert keywords for all tokens, then commit.
    ///
    /// Returns the distinct keywords and how many of them were inserted.
    fn upsert_keywords(
        &mut self,
        tokens: &[&str],
    ) -> Result<(Vec<Keyword>, usize), KeywordServiceError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut keywords: Vec<Keyword> = Vec::with_capacity(tokens.len());
        let mut created = 0;
        {
            let store = SqliteKeywordRepository::new(&tx);
            for token in tokens {
                let upserted = store.upsert_keyword(token)?;
                if upserted.created {
                    created += 1;
                }
                if !keywords.iter().any(|seen| seen.id == upserted.value.id) {
                    keywords.push(upserted.value);
                }
            }
        }
        tx.commit()?;
        Ok((keywords, created))
    }

    /// Phase 2: link every keyword to the post, then commit.
    fn link_keywords(
        &mut self,
        keywords: Vec<Keyword>,
        created_keywords: usize,
        post_id: PostId,
    ) -> Result<MergeReport, KeywordServiceError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut links = Vec::with_capacity(keywords.len());
        let mut created_links = 0;
        {
            let linker = SqlitePostKeywordRepository::new(&tx);
            for keyword in &keywords {
                let link = linker
                    .upsert_post_keyword(keyword.id, post_id)?
                    .ok_or(KeywordServiceError::LinkTargetMissing {
                        post_id,
                        keyword_id: keyword.id,
                    })?;
                if link.created {
                    created_links += 1;
                }
                links.push(link.value);
            }
        }
        tx.commit()?;

        Ok(MergeReport {
            post_id,
            keywords,
            links,
            created_keywords,
            created_links,
        })
    }
}
