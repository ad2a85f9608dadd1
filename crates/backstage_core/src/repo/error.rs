//! Repository error taxonomy.

use crate::db::DbError;
use crate::model::kind::EntityKind;
use crate::repo::query::QueryError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from repository reads, writes and tree traversal.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error, propagated unmodified.
    Db(DbError),
    /// Query builder could not resolve an alias, relation or column.
    Query(QueryError),
    /// Target record does not exist (or is trashed and trash was excluded).
    NotFound { kind: EntityKind, id: String },
    /// Tree operation requested on an entity without tree capability.
    NotTree(EntityKind),
    /// Persisted or supplied data cannot be converted to the expected shape.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Query(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::NotTree(kind) => write!(f, "{kind} is not a tree entity"),
            Self::InvalidData(message) => write!(f, "invalid record data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Query(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::NotTree(_) => None,
            Self::InvalidData(_) => None,
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

impl From<QueryError> for RepoError {
    fn from(value: QueryError) -> Self {
        Self::Query(value)
    }
}
