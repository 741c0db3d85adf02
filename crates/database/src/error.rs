//! Database error types.

use thiserror::Error;

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// SQLx error (connection, query, etc.)
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration error
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Record not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A unique key already holds a row.
    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },
}

impl DatabaseError {
    /// Map a unique-constraint violation to `AlreadyExists`, leaving other errors as-is.
    pub(crate) fn conflict(err: sqlx::Error, entity: &'static str, id: impl Into<String>) -> Self {
        if is_unique_violation(&err) {
            return DatabaseError::AlreadyExists {
                entity,
                id: id.into(),
            };
        }
        DatabaseError::Sqlx(err)
    }
}

/// Whether an SQLx error is a unique/primary-key violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, DatabaseError>;
