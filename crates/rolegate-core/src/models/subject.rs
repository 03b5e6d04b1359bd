//! Polymorphic subject references.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A model that permissions and roles can be attached to, tagged by its
/// type (e.g. `user`, `service_account`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectRef {
    pub subject_type: String,
    pub subject_id: Uuid,
}

impl SubjectRef {
    pub fn new(subject_type: impl Into<String>, subject_id: Uuid) -> Self {
        Self {
            subject_type: subject_type.into(),
            subject_id,
        }
    }
}

impl fmt::Display for SubjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.subject_type, self.subject_id)
    }
}
