//! Role domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use super::record::{Attributes, Record};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub code: String,
    pub guard_name: String,
    pub description: Option<String>,
    /// `None` when the record was hydrated from the permission cache.
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Role {
    /// Guards this role can be used with. A role belongs to exactly one
    /// guard today; checks are written against the set.
    pub fn guard_names(&self) -> Vec<String> {
        vec![self.guard_name.clone()]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRole {
    pub code: String,
    /// Falls back to the configured default guard when absent.
    pub guard_name: Option<String>,
    pub description: Option<String>,
}

impl CreateRole {
    pub fn new(code: impl Into<String>, guard_name: Option<&str>) -> Self {
        Self {
            code: code.into(),
            guard_name: guard_name.map(str::to_owned),
            description: None,
        }
    }
}

impl Record for Role {
    const ENTITY: &'static str = "role";

    fn key(&self) -> String {
        self.id.to_string()
    }

    fn attributes(&self) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert("id".into(), Value::String(self.id.to_string()));
        attributes.insert("code".into(), Value::String(self.code.clone()));
        attributes.insert("guard_name".into(), Value::String(self.guard_name.clone()));
        attributes.insert("description".into(), json!(self.description));
        attributes.insert("created_at".into(), json!(self.created_at));
        attributes.insert("updated_at".into(), json!(self.updated_at));
        attributes
    }

    fn from_attributes(attributes: Attributes) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(attributes))
    }
}
