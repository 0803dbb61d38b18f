//! Author repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Author names are unique; `users.name` carries the constraint.
//! - Names are stored as given (trimmed) and compared case-sensitively.

use crate::model::post::{User, UserId};
use crate::repo::{RepoError, RepoResult};
use log::debug;
use rusqlite::{Connection, OptionalExtension, Row};

/// Repository interface for post authors.
pub trait UserRepository {
    /// Returns the author with `name`, creating it on first use.
    fn get_or_create_user(&self, name: &str) -> RepoResult<User>;
    fn find_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn find_user_by_name(&self, name: &str) -> RepoResult<Option<User>>;
}

/// SQLite-backed author repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn get_or_create_user(&self, name: &str) -> RepoResult<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RepoError::InvalidArgument(
                "user name must not be blank".to_string(),
            ));
        }

        if let Some(user) = self.find_user_by_name(name)? {
            return Ok(user);
        }

        match self
            .conn
            .execute("INSERT INTO users (name) VALUES (?1);", [name])
        {
            Ok(_) => Ok(User {
                id: self.conn.last_insert_rowid(),
                name: name.to_string(),
            }),
            Err(err) => {
                let err = RepoError::from(err);
                if !matches!(&err, RepoError::Db(db) if db.is_unique_violation()) {
                    return Err(err);
                }
                debug!("event=user_upsert module=repo status=conflict action=lookup");
                self.find_user_by_name(name)?.ok_or_else(|| {
                    RepoError::InvalidData("user vanished after unique conflict".to_string())
                })
            }
        }
    }

    fn find_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, name FROM users WHERE id = ?1;",
                [id],
                parse_user_row,
            )
            .optional()?;
        Ok(user)
    }

    fn find_user_by_name(&self, name: &str) -> RepoResult<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, name FROM users WHERE name = ?1;",
                [name.trim()],
                parse_user_row,
            )
            .optional()?;
        Ok(user)
    }
}

fn parse_user_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        name: row.get("name")?,
    })
}
