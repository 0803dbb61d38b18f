//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for the blog core.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repositories borrow the caller's session (`&Connection` or a
//!   `Transaction` deref'd to one); they never open or hold their own.
//! - Repository APIs return semantic errors (`InvalidArgument`, `NotFound`) in
//!   addition to DB transport errors.
//! - "Referenced row does not exist" on lookups is `Ok(None)`, not an error.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod keyword_repo;
pub mod post_keyword_repo;
pub mod post_repo;
pub mod user_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Row returned by a get-or-create call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upserted<T> {
    pub value: T,
    /// `true` only when this call inserted the row.
    pub created: bool,
}

impl<T> Upserted<T> {
    pub(crate) fn created(value: T) -> Self {
        Self {
            value,
            created: true,
        }
    }

    pub(crate) fn existing(value: T) -> Self {
        Self {
            value,
            created: false,
        }
    }
}

/// Repository error shared by author, post and keyword persistence.
#[derive(Debug)]
pub enum RepoError {
    /// Required input is blank or otherwise unusable.
    InvalidArgument(String),
    Db(DbError),
    /// Target row does not exist for an update.
    NotFound { entity: &'static str, id: i64 },
    /// Persisted state does not match model invariants.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidArgument(_) | Self::NotFound { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
