//! Errors raised while decoding a cached permission snapshot.

use rolegate_core::error::RbacError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthzError {
    /// The cached value predates aliasing (no `alias` section). The
    /// registrar forgets such entries and rebuilds once.
    #[error("cached snapshot has no alias section")]
    MissingAlias,

    #[error("malformed cached snapshot: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl From<AuthzError> for RbacError {
    fn from(err: AuthzError) -> Self {
        RbacError::CorruptSnapshot(err.to_string())
    }
}
