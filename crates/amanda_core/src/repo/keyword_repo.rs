//! Keyword store: normalized, deduplicated keyword persistence.
//!
//! # Responsibility
//! - Normalize keyword text and upsert `keywords` rows idempotently.
//! - Answer keyword lookups by id, text and post.
//!
//! # Invariants
//! - Stored text is trimmed and lowercase; blank text is never stored.
//! - At most one row per normalized text. `keywords.text UNIQUE` enforces
//!   this; the lookup-before-insert is only the common path, and a unique
//!   conflict on insert is resolved by reading the winning row.
//! - Keywords are never edited or deleted here.

use crate::model::keyword::{normalize_keyword, Keyword, KeywordId};
use crate::model::post::PostId;
use crate::repo::{RepoError, RepoResult, Upserted};
use log::debug;
use rusqlite::{Connection, OptionalExtension, Row};

/// Repository interface for keyword entities.
pub trait KeywordRepository {
    /// Returns the keyword for the normalized `text`, inserting it when absent.
    ///
    /// The returned keyword always carries its storage id.
    fn get_or_create_keyword(&self, text: &str) -> RepoResult<Keyword> {
        self.upsert_keyword(text).map(|upserted| upserted.value)
    }
    /// Same as [`Self::get_or_create_keyword`], also telling whether this call
    /// inserted the row.
    fn upsert_keyword(&self, text: &str) -> RepoResult<Upserted<Keyword>>;
    fn find_keyword(&self, id: KeywordId) -> RepoResult<Option<Keyword>>;
    /// Looks up by text after normalizing it.
    fn find_keyword_by_text(&self, text: &str) -> RepoResult<Option<Keyword>>;
    /// Returns all keywords sorted by text.
    fn list_keywords(&self) -> RepoResult<Vec<Keyword>>;
    /// Returns the keywords linked to `post_id`, sorted by text.
    fn keywords_for_post(&self, post_id: PostId) -> RepoResult<Vec<Keyword>>;
}

/// SQLite-backed keyword store.
pub struct SqliteKeywordRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteKeywordRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl KeywordRepository for SqliteKeywordRepository<'_> {
    fn upsert_keyword(&self, text: &str) -> RepoResult<Upserted<Keyword>> {
        let normalized = normalize_keyword(text).ok_or_else(|| {
            RepoError::InvalidArgument("keyword text must not be blank".to_string())
        })?;

        if let Some(existing) = find_by_normalized_text(self.conn, &normalized)? {
            return Ok(Upserted::existing(existing));
        }

        insert_or_fetch_keyword(self.conn, normalized)
    }

    fn find_keyword(&self, id: KeywordId) -> RepoResult<Option<Keyword>> {
        let keyword = self
            .conn
            .query_row(
                "SELECT id, text FROM keywords WHERE id = ?1;",
                [id],
                parse_keyword_row,
            )
            .optional()?;
        Ok(keyword)
    }

    fn find_keyword_by_text(&self, text: &str) -> RepoResult<Option<Keyword>> {
        match normalize_keyword(text) {
            Some(normalized) => find_by_normalized_text(self.conn, &normalized),
            None => Ok(None),
        }
    }

    fn list_keywords(&self) -> RepoResult<Vec<Keyword>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, text FROM keywords ORDER BY text ASC;")?;
        let keywords = stmt
            .query_map([], parse_keyword_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(keywords)
    }

    fn keywords_for_post(&self, post_id: PostId) -> RepoResult<Vec<Keyword>> {
        let mut stmt = self.conn.prepare(
            "SELECT k.id AS id, k.text AS text
             FROM post_keywords pk
             INNER JOIN keywords k ON k.id = pk.keyword_id
             WHERE pk.post_id = ?1
             ORDER BY k.text ASC;",
        )?;
        let keywords = stmt
            .query_map([post_id], parse_keyword_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(keywords)
    }
}

fn find_by_normalized_text(conn: &Connection, normalized: &str) -> RepoResult<Option<Keyword>> {
    let keyword = conn
        .query_row(
            "SELECT id, text FROM keywords WHERE text = ?1;",
            [normalized],
            parse_keyword_row,
        )
        .optional()?;
    Ok(keyword)
}

/// Inserts `normalized`; a unique conflict means another writer won, so the
/// existing row is returned instead.
fn insert_or_fetch_keyword(
    conn: &Connection,
    normalized: String,
) -> RepoResult<Upserted<Keyword>> {
    match conn.execute("INSERT INTO keywords (text) VALUES (?1);", [normalized.as_str()]) {
        Ok(_) => Ok(Upserted::created(Keyword {
            id: conn.last_insert_rowid(),
            text: normalized,
        })),
        Err(err) => {
            let err = RepoError::from(err);
            if !matches!(&err, RepoError::Db(db) if db.is_unique_violation()) {
                return Err(err);
            }
            debug!("event=keyword_upsert module=repo status=conflict action=lookup");
            find_by_normalized_text(conn, &normalized)?
                .map(Upserted::existing)
                .ok_or_else(|| {
                    RepoError::InvalidData(format!(
                        "keyword `{normalized}` missing after unique conflict"
                    ))
                })
        }
    }
}

fn parse_keyword_row(row: &Row<'_>) -> rusqlite::Result<Keyword> {
    Ok(Keyword {
        id: row.get("id")?,
        text: row.get("text")?,
    })
}

#[cfg(test)]
mod tests {
    use super::{insert_or_fetch_keyword, KeywordRepository, SqliteKeywordRepository};
    use crate::db::open_db_in_memory;
    use crate::repo::RepoError;

    #[test]
    fn get_or_create_normalizes_and_reuses() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteKeywordRepository::new(&conn);

        let created = repo.get_or_create_keyword("  Cats ").unwrap();
        assert_eq!(created.text, "cats");
        let again = repo.get_or_create_keyword("CATS").unwrap();
        assert_eq!(again, created);
        assert_eq!(repo.list_keywords().unwrap().len(), 1);
    }

    #[test]
    fn upsert_reports_whether_the_row_was_inserted() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteKeywordRepository::new(&conn);

        let first = repo.upsert_keyword("Birds").unwrap();
        let second = repo.upsert_keyword(" birds").unwrap();
        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.value, second.value);
    }

    #[test]
    fn created_keyword_id_is_immediately_resolvable() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteKeywordRepository::new(&conn);

        let created = repo.get_or_create_keyword("dogs").unwrap();
        assert_eq!(repo.find_keyword(created.id).unwrap(), Some(created.clone()));
        assert_eq!(repo.find_keyword_by_text(" DOGS").unwrap(), Some(created));
    }

    #[test]
    fn blank_text_is_invalid_argument() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteKeywordRepository::new(&conn);

        for input in ["", "   ", "\t\n"] {
            let err = repo.get_or_create_keyword(input).unwrap_err();
            assert!(matches!(err, RepoError::InvalidArgument(_)));
        }
        assert!(repo.list_keywords().unwrap().is_empty());
    }

    #[test]
    fn insert_conflict_resolves_to_existing_row() {
        let conn = open_db_in_memory().unwrap();
        conn.execute("INSERT INTO keywords (text) VALUES ('cats');", [])
            .unwrap();
        let existing_id = conn.last_insert_rowid();

        // Simulates a writer that lost the race after its lookup saw nothing.
        let keyword = insert_or_fetch_keyword(&conn, "cats".to_string()).unwrap();
        assert_eq!(keyword.value.id, existing_id);
        assert!(!keyword.created);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM keywords;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
