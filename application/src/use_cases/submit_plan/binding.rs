//! Pulling bound values out of provider results.

use conductor_domain::core::string::normalize_identifier;
use serde_json::{Map, Value};

/// Fields that commonly wrap the actual list in API responses
const COLLECTION_FIELDS: &[&str] = &["items", "data", "results", "records", "list", "values"];

/// Extract `field` from a provider's value.
///
/// - object with the field → that value
/// - list → the field of its first element
/// - object wrapping a list under a collection field → the field of the
///   first element of that list
///
/// Field names match exactly first, then case- and separator-insensitively.
/// `null` counts as absent.
pub(crate) fn extract(value: &Value, field: &str) -> Option<Value> {
    match value {
        Value::Object(map) => field_of(map, field).or_else(|| {
            COLLECTION_FIELDS
                .iter()
                .filter_map(|name| map.get(*name))
                .find_map(|wrapped| first_item_field(wrapped, field))
        }),
        Value::Array(_) => first_item_field(value, field),
        _ => None,
    }
}

fn first_item_field(value: &Value, field: &str) -> Option<Value> {
    match value.as_array()?.first()? {
        Value::Object(item) => field_of(item, field),
        _ => None,
    }
}

fn field_of(map: &Map<String, Value>, field: &str) -> Option<Value> {
    let found = map.get(field).or_else(|| {
        let wanted = normalize_identifier(field);
        map.iter()
            .find(|(k, _)| normalize_identifier(k) == wanted)
            .map(|(_, v)| v)
    })?;
    (!found.is_null()).then(|| found.clone())
}
