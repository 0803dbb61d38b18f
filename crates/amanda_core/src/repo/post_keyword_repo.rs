//! Post/keyword linker: junction persistence between posts and keywords.
//!
//! # Responsibility
//! - Create `post_keywords` rows idempotently.
//! - Resolve post ids by keyword id(s).
//!
//! # Invariants
//! - The `(post_id, keyword_id)` primary key keeps the junction a set.
//! - A junction row is never created when the post or keyword is missing;
//!   the linker answers `Ok(None)` instead.

use crate::model::keyword::{KeywordId, PostKeyword};
use crate::model::post::PostId;
use crate::repo::{RepoError, RepoResult, Upserted};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

/// Repository interface for the post/keyword junction.
pub trait PostKeywordRepository {
    /// Returns the junction for the pair, creating it when both ends exist.
    ///
    /// Returns `Ok(None)` when either the post or the keyword does not exist.
    fn get_or_create_post_keyword(
        &self,
        keyword_id: KeywordId,
        post_id: PostId,
    ) -> RepoResult<Option<PostKeyword>> {
        Ok(self
            .upsert_post_keyword(keyword_id, post_id)?
            .map(|upserted| upserted.value))
    }
    /// Same as [`Self::get_or_create_post_keyword`], also telling whether this
    /// call inserted the row.
    fn upsert_post_keyword(
        &self,
        keyword_id: KeywordId,
        post_id: PostId,
    ) -> RepoResult<Option<Upserted<PostKeyword>>>;
    fn find_post_keyword(
        &self,
        keyword_id: KeywordId,
        post_id: PostId,
    ) -> RepoResult<Option<PostKeyword>>;
    /// Returns junction rows of one post ordered by keyword id.
    fn links_for_post(&self, post_id: PostId) -> RepoResult<Vec<PostKeyword>>;
    fn post_ids_by_keyword_id(&self, keyword_id: KeywordId) -> RepoResult<Vec<PostId>>;
    /// Returns distinct post ids linked to any of `keyword_ids`.
    fn post_ids_by_keyword_ids(&self, keyword_ids: &[KeywordId]) -> RepoResult<Vec<PostId>>;
}

/// SQLite-backed junction repository.
pub struct SqlitePostKeywordRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePostKeywordRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_post_ids(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<PostId>> {
        let mut stmt = self.conn.prepare(sql)?;
        let ids = stmt
            .query_map(params_from_iter(bind_values), |row| row.get::<_, PostId>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    fn row_exists(&self, sql: &str, id: i64) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(sql, [id], |row| row.get(0))?;
        Ok(exists == 1)
    }
}

impl PostKeywordRepository for SqlitePostKeywordRepository<'_> {
    fn upsert_post_keyword(
        &self,
        keyword_id: KeywordId,
        post_id: PostId,
    ) -> RepoResult<Option<Upserted<PostKeyword>>> {
        if let Some(existing) = self.find_post_keyword(keyword_id, post_id)? {
            return Ok(Some(Upserted::existing(existing)));
        }

        if !self.row_exists("SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1);", post_id)?
            || !self.row_exists(
                "SELECT EXISTS(SELECT 1 FROM keywords WHERE id = ?1);",
                keyword_id,
            )?
        {
            debug!(
                "event=post_keyword_link module=repo status=absent post_id={post_id} keyword_id={keyword_id}"
            );
            return Ok(None);
        }

        insert_or_fetch_link(
            self.conn,
            PostKeyword {
                post_id,
                keyword_id,
            },
        )
    }

    fn find_post_keyword(
        &self,
        keyword_id: KeywordId,
        post_id: PostId,
    ) -> RepoResult<Option<PostKeyword>> {
        let link = self
            .conn
            .query_row(
                "SELECT post_id, keyword_id
                 FROM post_keywords
                 WHERE post_id = ?1 AND keyword_id = ?2;",
                params![post_id, keyword_id],
                parse_link_row,
            )
            .optional()?;
        Ok(link)
    }

    fn links_for_post(&self, post_id: PostId) -> RepoResult<Vec<PostKeyword>> {
        let mut stmt = self.conn.prepare(
            "SELECT post_id, keyword_id
             FROM post_keywords
             WHERE post_id = ?1
             ORDER BY keyword_id ASC;",
        )?;
        let links = stmt
            .query_map([post_id], parse_link_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(links)
    }

    fn post_ids_by_keyword_id(&self, keyword_id: KeywordId) -> RepoResult<Vec<PostId>> {
        self.query_post_ids(
            "SELECT post_id FROM post_keywords WHERE keyword_id = ? ORDER BY post_id ASC;",
            vec![Value::Integer(keyword_id)],
        )
    }

    fn post_ids_by_keyword_ids(&self, keyword_ids: &[KeywordId]) -> RepoResult<Vec<PostId>> {
        if keyword_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; keyword_ids.len()].join(", ");
        self.query_post_ids(
            &format!(
                "SELECT DISTINCT post_id
                 FROM post_keywords
                 WHERE keyword_id IN ({placeholders})
                 ORDER BY post_id ASC;"
            ),
            keyword_ids.iter().map(|id| Value::Integer(*id)).collect(),
        )
    }
}

/// Inserts `link`. A key conflict means another writer linked the pair
/// first; a foreign-key failure means an end was deleted after the check.
fn insert_or_fetch_link(
    conn: &Connection,
    link: PostKeyword,
) -> RepoResult<Option<Upserted<PostKeyword>>> {
    match conn.execute(
        "INSERT INTO post_keywords (post_id, keyword_id) VALUES (?1, ?2);",
        params![link.post_id, link.keyword_id],
    ) {
        Ok(_) => Ok(Some(Upserted::created(link))),
        Err(err) => match RepoError::from(err) {
            RepoError::Db(db) if db.is_unique_violation() => {
                debug!("event=post_keyword_link module=repo status=conflict action=lookup");
                Ok(Some(Upserted::existing(link)))
            }
            RepoError::Db(db) if db.is_foreign_key_violation() => {
                debug!(
                    "event=post_keyword_link module=repo status=absent post_id={} keyword_id={} reason=fk_violation",
                    link.post_id, link.keyword_id
                );
                Ok(None)
            }
            other => Err(other),
        },
    }
}

fn parse_link_row(row: &Row<'_>) -> rusqlite::Result<PostKeyword> {
    Ok(PostKeyword {
        post_id: row.get("post_id")?,
        keyword_id: row.get("keyword_id")?,
    })
}
