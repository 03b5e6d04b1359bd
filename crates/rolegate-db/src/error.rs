//! Database-specific error types and conversions.

use rolegate_core::error::RbacError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl DbError {
    /// Whether the error is a unique index violation.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DbError::Query(msg) => msg.contains("already contains"),
            DbError::Surreal(err) => err.to_string().contains("already contains"),
            _ => false,
        }
    }
}

impl From<DbError> for RbacError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => RbacError::NotFound { entity, id },
            other => RbacError::Database(other.to_string()),
        }
    }
}
