//! Response truncation
//!
//! Bounds list-shaped payloads before they reach a context-limited consumer.
//!
//! - A list longer than `max_items` keeps its first `max_items` items.
//! - An object is never truncated as a whole; each top-level list field is
//!   truncated on its own and the per-field bookkeeping is embedded under
//!   `_truncation`, unless the payload already has a field of that name.
//! - Scalars pass through untouched. Items are never reordered or sampled.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Field under which per-field truncation info is embedded in objects
pub const TRUNCATION_FIELD: &str = "_truncation";

pub const DEFAULT_MAX_ITEMS: usize = 100;

/// Bookkeeping for one truncated list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TruncationInfo {
    pub total_count: usize,
    pub returned_count: usize,
    pub truncated: bool,
}

impl TruncationInfo {
    fn note(&self) -> String {
        format!(
            "Response limited to {} items out of {} total items",
            self.returned_count, self.total_count
        )
    }
}

/// A payload after truncation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TruncatedResult {
    pub value: Value,
    /// Present when the payload itself is a list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<TruncationInfo>,
    /// Truncated list fields of an object payload
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, TruncationInfo>,
    /// Human-readable explanation, when anything was cut
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl TruncatedResult {
    pub fn is_truncated(&self) -> bool {
        self.info.is_some_and(|i| i.truncated) || !self.fields.is_empty()
    }

    fn untouched(value: Value) -> Self {
        Self {
            value,
            info: None,
            fields: BTreeMap::new(),
            note: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Truncator {
    max_items: usize,
}

impl Default for Truncator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITEMS)
    }
}

impl Truncator {
    pub fn new(max_items: usize) -> Self {
        Self { max_items }
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    pub fn truncate(&self, value: Value) -> TruncatedResult {
        match value {
            Value::Array(items) => {
                let (items, info) = self.truncate_list(items);
                TruncatedResult {
                    value: Value::Array(items),
                    note: info.truncated.then(|| info.note()),
                    info: Some(info),
                    fields: BTreeMap::new(),
                }
            }
            Value::Object(map) => self.truncate_object(map),
            scalar => TruncatedResult::untouched(scalar),
        }
    }

    fn truncate_list(&self, mut items: Vec<Value>) -> (Vec<Value>, TruncationInfo) {
        let total_count = items.len();
        let truncated = total_count > self.max_items;
        if truncated {
            items.truncate(self.max_items);
        }
        let info = TruncationInfo {
            total_count,
            returned_count: items.len(),
            truncated,
        };
        (items, info)
    }

    fn truncate_object(&self, map: Map<String, Value>) -> TruncatedResult {
        let mut fields = BTreeMap::new();
        let mut out = Map::with_capacity(map.len());

        for (key, value) in map {
            match value {
                Value::Array(items) if items.len() > self.max_items => {
                    let (items, info) = self.truncate_list(items);
                    fields.insert(key.clone(), info);
                    out.insert(key, Value::Array(items));
                }
                other => {
                    out.insert(key, other);
                }
            }
        }

        if fields.is_empty() {
            return TruncatedResult::untouched(Value::Object(out));
        }

        let note = fields
            .iter()
            .map(|(field, info)| format!("{}: {}", field, info.note()))
            .collect::<Vec<_>>()
            .join("; ");
        // A payload that already owns the field keeps it; the bookkeeping
        // is still reported through `fields` and `note`.
        if !out.contains_key(TRUNCATION_FIELD) {
            let embedded: Map<String, Value> = fields
                .iter()
                .map(|(field, info)| {
                    (
                        field.clone(),
                        serde_json::to_value(info).unwrap_or(Value::Null),
                    )
                })
                .collect();
            out.insert(TRUNCATION_FIELD.to_string(), Value::Object(embedded));
        }

        TruncatedResult {
            value: Value::Object(out),
            info: None,
            fields,
            note: Some(note),
        }
    }
}
