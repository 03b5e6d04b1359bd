//! Permission domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use super::record::{Attributes, Record};
use super::role::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub id: Uuid,
    /// Human-chosen code (e.g. `edit-articles`), unique per guard.
    pub code: String,
    pub guard_name: String,
    pub description: Option<String>,
    /// `None` when the record was hydrated from the permission cache.
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Roles this permission is granted to. Only populated on records
    /// served by the permission cache.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePermission {
    pub code: String,
    /// Falls back to the configured default guard when absent.
    pub guard_name: Option<String>,
    pub description: Option<String>,
}

impl CreatePermission {
    pub fn new(code: impl Into<String>, guard_name: Option<&str>) -> Self {
        Self {
            code: code.into(),
            guard_name: guard_name.map(str::to_owned),
            description: None,
        }
    }
}

impl Record for Permission {
    const ENTITY: &'static str = "permission";

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

    fn attribute(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::String(self.id.to_string())),
            "code" => Some(Value::String(self.code.clone())),
            "guard_name" => Some(Value::String(self.guard_name.clone())),
            "description" => Some(json!(self.description)),
            "created_at" => Some(json!(self.created_at)),
            "updated_at" => Some(json!(self.updated_at)),
            _ => None,
        }
    }
}
