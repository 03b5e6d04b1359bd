//! Error types for the rolegate system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RbacError {
    #[error("A `{code}` {entity} already exists for guard `{guard}`")]
    AlreadyExists {
        entity: String,
        code: String,
        guard: String,
    },

    #[error("There is no {entity} with code or id `{key}` for guard `{guard}`")]
    DoesNotExist {
        entity: String,
        key: String,
        guard: String,
    },

    /// A permission was used with a role (or subject) whose guards do not
    /// include the permission's guard.
    #[error("The given guard `{given}` does not match any of [{}]", .expected.join(", "))]
    GuardMismatch { given: String, expected: Vec<String> },

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Corrupt permission cache snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cache error: {0}")]
    Cache(String),
}

impl RbacError {
    pub fn already_exists(
        entity: impl Into<String>,
        code: impl Into<String>,
        guard: impl Into<String>,
    ) -> Self {
        Self::AlreadyExists {
            entity: entity.into(),
            code: code.into(),
            guard: guard.into(),
        }
    }

    pub fn does_not_exist(
        entity: impl Into<String>,
        key: impl Into<String>,
        guard: impl Into<String>,
    ) -> Self {
        Self::DoesNotExist {
            entity: entity.into(),
            key: key.into(),
            guard: guard.into(),
        }
    }

    pub fn guard_mismatch(given: impl Into<String>, expected: Vec<String>) -> Self {
        Self::GuardMismatch {
            given: given.into(),
            expected,
        }
    }
}

pub type RbacResult<T> = Result<T, RbacError>;
