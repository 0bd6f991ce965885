//! Hosted table store access.
//!
//! Everything eventdesk persists lives in a remote tabular store: one
//! named table per record kind, records with opaque IDs and a loose
//! field mapping. [`TableStore`] is the contract the rest of the crate
//! talks to; [`airtable::AirtableStore`] speaks the hosted REST API and
//! [`memory::MemoryStore`] keeps everything in process.

pub mod airtable;
pub mod memory;

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EventDeskResult;

/// Field name → value mapping of a record.
pub type Fields = serde_json::Map<String, Value>;

/// A stored row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub fields: Fields,
}

impl Record {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    pub fn i64_field(&self, name: &str) -> Option<i64> {
        self.fields.get(name).and_then(value_as_i64)
    }
}

/// Integers may come back as floats (`42.0`) or strings (`"42"`).
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Row filter, rendered to the store's formula language for remote
/// queries and evaluated directly by the in-memory store.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Eq(String, Value),
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn and(self, other: Filter) -> Self {
        match self {
            Filter::All => other,
            Filter::And(mut parts) => {
                parts.push(other);
                Filter::And(parts)
            }
            first => Filter::And(vec![first, other]),
        }
    }

    /// Formula text, or `None` when every row matches.
    pub fn to_formula(&self) -> Option<String> {
        match self {
            Filter::All => None,
            Filter::Eq(field, value) => Some(format!("{{{}}} = {}", field, formula_literal(value))),
            Filter::And(parts) => {
                let rendered: Vec<String> = parts.iter().filter_map(Filter::to_formula).collect();
                match rendered.len() {
                    0 => None,
                    1 => rendered.into_iter().next(),
                    _ => Some(format!("AND({})", rendered.join(", "))),
                }
            }
        }
    }

    pub fn matches(&self, fields: &Fields) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, expected) => fields
                .get(field)
                .is_some_and(|actual| values_equal(actual, expected)),
            Filter::And(parts) => parts.iter().all(|p| p.matches(fields)),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.to_formula() {
            Some(formula) => write!(f, "{formula}"),
            None => write!(f, "*"),
        }
    }
}

fn formula_literal(value: &Value) -> String {
    match value {
        Value::Bool(true) => "TRUE()".to_string(),
        Value::Bool(false) => "FALSE()".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
        Value::Null => "BLANK()".to_string(),
        other => format!("'{}'", other.to_string().replace('\'', "\\'")),
    }
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => actual == expected,
    }
}

/// Operations the remote store offers per named table.
pub trait TableStore {
    /// Every row of `table` matching `filter`, in store order.
    fn query_all(
        &self,
        table: &str,
        filter: &Filter,
    ) -> impl Future<Output = EventDeskResult<Vec<Record>>> + Send;

    fn create(
        &self,
        table: &str,
        fields: Fields,
    ) -> impl Future<Output = EventDeskResult<Record>> + Send;

    /// Merge `fields` into an existing row.
    fn update(
        &self,
        table: &str,
        record_id: &str,
        fields: Fields,
    ) -> impl Future<Output = EventDeskResult<Record>> + Send;

    fn delete(&self, table: &str, record_id: &str)
    -> impl Future<Output = EventDeskResult<()>> + Send;

    fn batch_delete(
        &self,
        table: &str,
        record_ids: &[String],
    ) -> impl Future<Output = EventDeskResult<()>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_formula_rendering() {
        assert_eq!(Filter::All.to_formula(), None);
        assert_eq!(
            Filter::eq("event_id", 42).to_formula().unwrap(),
            "{event_id} = 42"
        );
        assert_eq!(
            Filter::eq("event_id", 42)
                .and(Filter::eq("feature_id", 1))
                .to_formula()
                .unwrap(),
            "AND({event_id} = 42, {feature_id} = 1)"
        );
        assert_eq!(
            Filter::eq("name", "O'Brien").to_formula().unwrap(),
            "{name} = 'O\\'Brien'"
        );
        assert_eq!(
            Filter::eq("is_active", true).to_formula().unwrap(),
            "{is_active} = TRUE()"
        );
    }

    #[test]
    fn test_filter_matches_numbers_loosely() {
        let fields = json!({ "event_id": 42.0, "feature_id": 1 })
            .as_object()
            .cloned()
            .unwrap();

        assert!(Filter::eq("event_id", 42).matches(&fields));
        assert!(
            Filter::eq("event_id", 42)
                .and(Filter::eq("feature_id", 1))
                .matches(&fields)
        );
        assert!(!Filter::eq("event_id", 7).matches(&fields));
        assert!(!Filter::eq("missing", 1).matches(&fields));
        assert!(Filter::All.matches(&fields));
    }

    #[test]
    fn test_value_as_i64() {
        assert_eq!(value_as_i64(&json!(3)), Some(3));
        assert_eq!(value_as_i64(&json!(3.0)), Some(3));
        assert_eq!(value_as_i64(&json!(" 12 ")), Some(12));
        assert_eq!(value_as_i64(&json!(3.5)), None);
        assert_eq!(value_as_i64(&json!(null)), None);
    }
}
