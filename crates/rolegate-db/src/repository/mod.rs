//! SurrealDB repository implementations.

mod permission;
mod role;

pub use permission::SurrealPermissionRepository;
pub use role::SurrealRoleRepository;

use uuid::Uuid;

use crate::error::DbError;

/// Parse the string form of a record id back into a [`Uuid`].
pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw).map_err(|e| DbError::InvalidRecord(format!("invalid UUID `{raw}`: {e}")))
}

/// A lookup key in the form record ids are stored in: identifiers that
/// parse as a UUID are rewritten to lowercase hyphenated form, anything
/// else is kept as a code.
pub(crate) fn normalize_key(code_or_id: &str) -> String {
    match Uuid::parse_str(code_or_id) {
        Ok(id) => id.to_string(),
        Err(_) => code_or_id.to_owned(),
    }
}
