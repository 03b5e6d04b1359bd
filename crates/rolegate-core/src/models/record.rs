//! Ordered attribute access for records held in the permission cache.
//!
//! Each entity declares its retained field set statically: `attributes`
//! lists the fields in declaration order and `from_attributes` rebuilds
//! the record from a (possibly partial) map. Fields missing from the map
//! take their empty value, which is how excluded timestamps come back
//! from a compacted snapshot.

use serde_json::{Map, Value};

/// Field name → value, in declaration order.
pub type Attributes = Map<String, Value>;

pub trait Record: Sized {
    /// Entity name used in error messages (`permission`, `role`).
    const ENTITY: &'static str;

    /// String form of the record's identity.
    fn key(&self) -> String;

    fn attributes(&self) -> Attributes;

    fn from_attributes(attributes: Attributes) -> Result<Self, serde_json::Error>;

    /// Value of a single attribute, or `None` if the record has no such
    /// field.
    fn attribute(&self, name: &str) -> Option<Value> {
        self.attributes().remove(name)
    }
}
