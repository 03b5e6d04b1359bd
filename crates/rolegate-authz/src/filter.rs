//! Attribute filters over cached records.

use rolegate_core::models::record::Record;
use serde_json::Value;

/// Conjunction of `attribute == value` conditions.
///
/// Comparison is loose: a number equals its decimal string form
/// (`1 == "1"`), and `null` equals the empty string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeFilter {
    conditions: Vec<(String, Value)>,
}

impl AttributeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((name.into(), value.into()));
        self
    }

    pub fn code(self, code: impl Into<String>) -> Self {
        self.with("code", code.into())
    }

    pub fn guard_name(self, guard_name: impl Into<String>) -> Self {
        self.with("guard_name", guard_name.into())
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// An empty filter matches every record. A condition on an attribute
    /// the record does not have never matches.
    pub fn matches<R: Record>(&self, record: &R) -> bool {
        self.conditions.iter().all(|(name, expected)| {
            record
                .attribute(name)
                .is_some_and(|actual| loosely_equal(&actual, expected))
        })
    }
}

fn loosely_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            match (s.trim().parse::<f64>(), n.as_f64()) {
                (Ok(parsed), Some(number)) => parsed == number,
                _ => false,
            }
        }
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Null, Value::String(s)) | (Value::String(s), Value::Null) => s.is_empty(),
        _ => left == right,
    }
}
