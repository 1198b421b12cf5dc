//! Compact descriptions of cached payloads
//!
//! A [`Summary`] answers "what does this contain" without the payload:
//! kind, length or key set, a small sample, the field types of list items,
//! and min/max/avg of a few numeric fields.

use crate::core::string::truncate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const SAMPLE_ITEMS: usize = 3;
const MAX_KEYS: usize = 10;
const MAX_NUMERIC_FIELDS: usize = 3;
const SCALAR_PREVIEW_BYTES: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryKind {
    List,
    Object,
    Scalar,
}

impl SummaryKind {
    pub fn as_str(&self) -> &str {
        match self {
            SummaryKind::List => "list",
            SummaryKind::Object => "object",
            SummaryKind::Scalar => "scalar",
        }
    }
}

impl std::fmt::Display for SummaryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub kind: SummaryKind,
    /// Item count for lists, key count for objects
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    /// First keys of an object
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,
    /// First items, first fields, or a scalar preview
    pub sample: Value,
    /// Field → JSON type of the first list item
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub schema: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub numeric_stats: BTreeMap<String, NumericStats>,
    /// Serialized size of the full payload
    pub size_bytes: usize,
}

impl Summary {
    pub fn of(value: &Value, size_bytes: usize) -> Self {
        match value {
            Value::Array(items) => Self::of_list(items, size_bytes),
            Value::Object(map) => Self::of_object(map, size_bytes),
            scalar => Self {
                kind: SummaryKind::Scalar,
                length: None,
                keys: Vec::new(),
                sample: scalar_preview(scalar),
                schema: BTreeMap::new(),
                numeric_stats: BTreeMap::new(),
                size_bytes,
            },
        }
    }

    fn of_list(items: &[Value], size_bytes: usize) -> Self {
        let schema = match items.first() {
            Some(Value::Object(first)) => first
                .iter()
                .map(|(k, v)| (k.clone(), json_type(v).to_string()))
                .collect(),
            _ => BTreeMap::new(),
        };

        let numeric_fields: Vec<&String> = schema
            .iter()
            .filter(|(_, t)| t.as_str() == "number")
            .map(|(k, _)| k)
            .take(MAX_NUMERIC_FIELDS)
            .collect();

        let mut numeric_stats = BTreeMap::new();
        for field in numeric_fields {
            let values: Vec<f64> = items
                .iter()
                .filter_map(|item| item.get(field.as_str()).and_then(Value::as_f64))
                .collect();
            if let Some(stats) = stats_of(&values) {
                numeric_stats.insert(field.clone(), stats);
            }
        }

        Self {
            kind: SummaryKind::List,
            length: Some(items.len()),
            keys: Vec::new(),
            sample: Value::Array(items.iter().take(SAMPLE_ITEMS).cloned().collect()),
            schema,
            numeric_stats,
            size_bytes,
        }
    }

    fn of_object(map: &Map<String, Value>, size_bytes: usize) -> Self {
        let sample: Map<String, Value> = map
            .iter()
            .take(SAMPLE_ITEMS)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Self {
            kind: SummaryKind::Object,
            length: Some(map.len()),
            keys: map.keys().take(MAX_KEYS).cloned().collect(),
            sample: Value::Object(sample),
            schema: BTreeMap::new(),
            numeric_stats: BTreeMap::new(),
            size_bytes,
        }
    }

    /// One-line description, e.g. `list of 500 items (48213 bytes)`
    pub fn describe(&self) -> String {
        match (self.kind, self.length) {
            (SummaryKind::List, Some(n)) => format!("list of {} items ({} bytes)", n, self.size_bytes),
            (SummaryKind::Object, Some(n)) => format!(
                "object with {} keys [{}] ({} bytes)",
                n,
                self.keys.join(", "),
                self.size_bytes
            ),
            _ => format!("scalar ({} bytes)", self.size_bytes),
        }
    }
}

fn scalar_preview(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(truncate(s, SCALAR_PREVIEW_BYTES)),
        other => other.clone(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn stats_of(values: &[f64]) -> Option<NumericStats> {
    if values.is_empty() {
        return None;
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    Some(NumericStats { min, max, avg })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_summary() {
        let value = json!([
            {"id": "p1", "amount": 10, "fee": 1.5},
            {"id": "p2", "amount": 30, "fee": 0.5},
            {"id": "p3", "amount": 20},
            {"id": "p4", "amount": 40},
        ]);
        let summary = Summary::of(&value, 123);

        assert_eq!(summary.kind, SummaryKind::List);
        assert_eq!(summary.length, Some(4));
        assert_eq!(summary.sample.as_array().unwrap().len(), 3);
        assert_eq!(summary.schema["id"], "string");
        assert_eq!(summary.schema["amount"], "number");

        let amount = summary.numeric_stats["amount"];
        assert_eq!(amount.min, 10.0);
        assert_eq!(amount.max, 40.0);
        assert_eq!(amount.avg, 25.0);
        // Only items carrying the field count
        assert_eq!(summary.numeric_stats["fee"].avg, 1.0);
        assert_eq!(summary.describe(), "list of 4 items (123 bytes)");
    }

    #[test]
    fn test_object_summary() {
        let value = json!({"a": 1, "b": 2, "c": 3, "d": 4});
        let summary = Summary::of(&value, 30);

        assert_eq!(summary.kind, SummaryKind::Object);
        assert_eq!(summary.length, Some(4));
        assert_eq!(summary.keys, vec!["a", "b", "c", "d"]);
        assert_eq!(summary.sample, json!({"a": 1, "b": 2, "c": 3}));
    }

    #[test]
    fn test_empty_containers() {
        let summary = Summary::of(&json!([]), 2);
        assert_eq!(summary.length, Some(0));
        assert!(summary.schema.is_empty());

        let summary = Summary::of(&json!({}), 2);
        assert_eq!(summary.length, Some(0));
        assert!(summary.keys.is_empty());
    }

    #[test]
    fn test_scalar_preview_is_bounded() {
        let long = "x".repeat(2_000);
        let summary = Summary::of(&json!(long), 2_002);

        assert_eq!(summary.kind, SummaryKind::Scalar);
        assert_eq!(summary.sample.as_str().unwrap().len(), 500);
        assert_eq!(summary.length, None);
    }
}
