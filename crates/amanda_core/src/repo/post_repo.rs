//! Post repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist posts and load them with their author attached.
//! - Provide the keyword, author, title and recency queries used by post
//!   search and listing.
//!
//! # Invariants
//! - Every returned post carries its author (`posts.user_id` is NOT NULL).
//! - List results are ordered by `posts.id ASC`, except recent posts which
//!   are newest first.
//! - Text matching is case-sensitive substring containment (`instr`).
//! - Queries bind a bounded number of parameters regardless of result size.

use crate::model::post::{Post, PostId, User, UserId};
use crate::repo::{RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const POST_SELECT_SQL: &str = "SELECT
    posts.id AS id,
    posts.title AS title,
    posts.content AS content,
    posts.summary AS summary,
    posts.image_href AS image_href,
    posts.sentiment AS sentiment,
    posts.created_at AS created_at,
    users.id AS user_id,
    users.name AS user_name
FROM posts
INNER JOIN users ON users.id = posts.user_id";

/// Ids bound per `IN (...)` statement; well under SQLite's variable limit.
const ID_CHUNK_SIZE: usize = 500;

/// Enrichment projection written back onto a post.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostEnrichmentUpdate {
    pub summary: Option<String>,
    pub image_href: Option<String>,
    pub sentiment: Option<f64>,
}

/// Repository interface for post persistence and queries.
pub trait PostRepository {
    /// Inserts one post and returns its storage-assigned id.
    fn create_post(&self, user_id: UserId, title: &str, content: &str) -> RepoResult<PostId>;
    fn get_post(&self, id: PostId) -> RepoResult<Option<Post>>;
    fn post_exists(&self, id: PostId) -> RepoResult<bool>;
    /// Returns every post.
    fn list_posts(&self) -> RepoResult<Vec<Post>>;
    /// Returns the posts among `ids` that exist; duplicates collapse.
    fn list_posts_by_ids(&self, ids: &[PostId]) -> RepoResult<Vec<Post>>;
    /// Returns posts linked to a keyword whose text occurs inside `search`.
    ///
    /// `search` is the haystack and is not normalized: `"I love cats"` finds
    /// keyword `cats`, `"cat"` does not.
    fn list_posts_by_keyword_string(&self, search: &str) -> RepoResult<Vec<Post>>;
    /// Returns posts whose author name contains `fragment`.
    fn list_posts_by_author_substring(&self, fragment: &str) -> RepoResult<Vec<Post>>;
    fn list_posts_by_author_id(&self, user_id: UserId) -> RepoResult<Vec<Post>>;
    /// Returns posts whose title contains `fragment` or that are linked to a
    /// keyword whose text contains `fragment`.
    fn list_posts_by_title_or_keyword_substring(&self, fragment: &str)
        -> RepoResult<Vec<Post>>;
    /// Returns at most `limit` posts, newest first.
    fn list_recent_posts(&self, limit: usize) -> RepoResult<Vec<Post>>;
    fn apply_enrichment(&self, id: PostId, update: &PostEnrichmentUpdate) -> RepoResult<()>;
}

/// SQLite-backed post repository.
pub struct SqlitePostRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePostRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_posts(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Post>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut posts = Vec::new();
        while let Some(row) = rows.next()? {
            posts.push(parse_post_row(row)?);
        }
        Ok(posts)
    }
}

impl PostRepository for SqlitePostRepository<'_> {
    fn create_post(&self, user_id: UserId, title: &str, content: &str) -> RepoResult<PostId> {
        self.conn.execute(
            "INSERT INTO posts (user_id, title, content) VALUES (?1, ?2, ?3);",
            params![user_id, title, content],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_post(&self, id: PostId) -> RepoResult<Option<Post>> {
        let post = self
            .conn
            .query_row(
                &format!("{POST_SELECT_SQL} WHERE posts.id = ?1;"),
                [id],
                parse_post_row,
            )
            .optional()?;
        Ok(post)
    }

    fn post_exists(&self, id: PostId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn list_posts(&self) -> RepoResult<Vec<Post>> {
        self.query_posts(&format!("{POST_SELECT_SQL} ORDER BY posts.id ASC;"), Vec::new())
    }

    fn list_posts_by_ids(&self, ids: &[PostId]) -> RepoResult<Vec<Post>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        // Chunks are disjoint and ascending, so concatenation keeps the order.
        let mut posts = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(ID_CHUNK_SIZE) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "{POST_SELECT_SQL} WHERE posts.id IN ({placeholders}) ORDER BY posts.id ASC;"
            );
            let bind_values = chunk.iter().map(|id| Value::Integer(*id)).collect();
            posts.extend(self.query_posts(&sql, bind_values)?);
        }
        Ok(posts)
    }

    fn list_posts_by_keyword_string(&self, search: &str) -> RepoResult<Vec<Post>> {
        // instr(haystack, needle): the search string is the haystack.
        self.query_posts(
            &format!(
                "{POST_SELECT_SQL}
                 WHERE posts.id IN (
                    SELECT pk.post_id
                    FROM post_keywords pk
                    INNER JOIN keywords k ON k.id = pk.keyword_id
                    WHERE instr(?1, k.text) > 0
                 )
                 ORDER BY posts.id ASC;"
            ),
            vec![Value::Text(search.to_string())],
        )
    }

    fn list_posts_by_author_substring(&self, fragment: &str) -> RepoResult<Vec<Post>> {
        self.query_posts(
            &format!("{POST_SELECT_SQL} WHERE instr(users.name, ?) > 0 ORDER BY posts.id ASC;"),
            vec![Value::Text(fragment.to_string())],
        )
    }

    fn list_posts_by_author_id(&self, user_id: UserId) -> RepoResult<Vec<Post>> {
        self.query_posts(
            &format!("{POST_SELECT_SQL} WHERE posts.user_id = ?1 ORDER BY posts.id ASC;"),
            vec![Value::Integer(user_id)],
        )
    }

    fn list_posts_by_title_or_keyword_substring(
        &self,
        fragment: &str,
    ) -> RepoResult<Vec<Post>> {
        self.query_posts(
            &format!(
                "{POST_SELECT_SQL}
                 WHERE instr(posts.title, ?1) > 0
                    OR posts.id IN (
                        SELECT pk.post_id
                        FROM post_keywords pk
                        INNER JOIN keywords k ON k.id = pk.keyword_id
                        WHERE instr(k.text, ?1) > 0
                    )
                 ORDER BY posts.id ASC;"
            ),
            vec![Value::Text(fragment.to_string())],
        )
    }

    fn list_recent_posts(&self, limit: usize) -> RepoResult<Vec<Post>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.query_posts(
            &format!(
                "{POST_SELECT_SQL} ORDER BY posts.created_at DESC, posts.id DESC LIMIT ?1;"
            ),
            vec![Value::Integer(limit)],
        )
    }

    fn apply_enrichment(&self, id: PostId, update: &PostEnrichmentUpdate) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE posts
             SET
                summary = ?2,
                image_href = ?3,
                sentiment = ?4
             WHERE id = ?1;",
            params![
                id,
                update.summary.as_deref(),
                update.image_href.as_deref(),
                update.sentiment,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound { entity: "post", id });
        }
        Ok(())
    }
}

fn parse_post_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get("id")?,
        author: User {
            id: row.get("user_id")?,
            name: row.get("user_name")?,
        },
        title: row.get("title")?,
        content: row.get("content")?,
        summary: row.get("summary")?,
        image_href: row.get("image_href")?,
        sentiment: row.get("sentiment")?,
        created_at: row.get("created_at")?,
    })
}
