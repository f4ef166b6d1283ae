use minivault_core::{CanonicalField, PropertyType};
use serde_json::{json, Map, Value as JsonValue};
use thiserror::Error;
use tracing::debug;

use crate::ResolvedFieldMap;

/// Notion rejects rich-text content longer than this per span.
const MAX_SPAN_CHARS: usize = 2000;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BuildError {
    #[error("field `{field}` maps to a read-only {property_type} property")]
    ReadOnly {
        field: String,
        property_type: PropertyType,
    },
    #[error("field `{field}` expects a number, got `{value}`")]
    InvalidNumber { field: String, value: String },
}

/// Encode one raw input value for a property of type `ty`.
///
/// The encoding depends only on the resolved type, never on the field meaning.
pub fn build(field: &str, raw: &JsonValue, ty: &PropertyType) -> Result<JsonValue, BuildError> {
    if ty.is_read_only() {
        return Err(BuildError::ReadOnly {
            field: field.to_string(),
            property_type: ty.clone(),
        });
    }

    let tag = ty.as_tag();
    let payload = match ty {
        PropertyType::Title | PropertyType::RichText => json!({ tag: rich_text(raw) }),
        PropertyType::Number => json!({ "number": number(field, raw)? }),
        PropertyType::Select | PropertyType::Status => match scalar_text(raw) {
            Some(name) if !name.is_empty() => json!({ tag: { "name": name } }),
            _ => json!({ tag: null }),
        },
        PropertyType::MultiSelect => {
            let options: Vec<JsonValue> = option_names(raw)
                .into_iter()
                .map(|name| json!({ "name": name }))
                .collect();
            json!({ "multi_select": options })
        }
        PropertyType::Date => match scalar_text(raw) {
            Some(start) if !start.is_empty() => json!({ "date": { "start": start } }),
            _ => json!({ "date": null }),
        },
        PropertyType::Checkbox => json!({ "checkbox": truthy(raw) }),
        PropertyType::Url | PropertyType::Email | PropertyType::PhoneNumber => match scalar_text(raw) {
            Some(text) if !text.is_empty() => json!({ tag: text }),
            _ => json!({ tag: null }),
        },
        PropertyType::Formula
        | PropertyType::Rollup
        | PropertyType::CreatedTime
        | PropertyType::LastEditedTime
        | PropertyType::Other(_) => json!({ "rich_text": rich_text(raw) }),
    };
    Ok(payload)
}

/// Text spans of at most [`MAX_SPAN_CHARS`] each. Null and empty input clear the property.
fn rich_text(raw: &JsonValue) -> Vec<JsonValue> {
    let Some(text) = scalar_text(raw) else {
        return Vec::new();
    };
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(MAX_SPAN_CHARS)
        .map(|chunk| {
            let content: String = chunk.iter().collect();
            json!({ "type": "text", "text": { "content": content } })
        })
        .collect()
}

/// Stringify scalars; arrays join with ", ". `None` for null.
fn scalar_text(raw: &JsonValue) -> Option<String> {
    match raw {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.trim().to_string()),
        JsonValue::Array(items) => Some(
            items
                .iter()
                .filter_map(scalar_text)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        other => Some(other.to_string()),
    }
}

fn number(field: &str, raw: &JsonValue) -> Result<JsonValue, BuildError> {
    let invalid = || BuildError::InvalidNumber {
        field: field.to_string(),
        value: scalar_text(raw).unwrap_or_default(),
    };
    match raw {
        JsonValue::Null => Ok(JsonValue::Null),
        JsonValue::Number(_) => Ok(raw.clone()),
        JsonValue::String(s) if s.trim().is_empty() => Ok(JsonValue::Null),
        JsonValue::String(s) => {
            let s = s.trim();
            if let Ok(n) = s.parse::<i64>() {
                return Ok(json!(n));
            }
            s.parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(|n| json!(n))
                .ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}

fn option_names(raw: &JsonValue) -> Vec<String> {
    match raw {
        JsonValue::Array(items) => items.iter().filter_map(scalar_text).collect(),
        JsonValue::String(s) => s.split(',').map(str::trim).map(ToString::to_string).collect(),
        JsonValue::Null => Vec::new(),
        other => vec![other.to_string()],
    }
    .into_iter()
    .filter(|name| !name.is_empty())
    .collect()
}

fn truthy(raw: &JsonValue) -> bool {
    match raw {
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        JsonValue::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "1" | "yes" | "on"
        ),
        _ => false,
    }
}

/// Properties payload for a page write, plus the fields that had nowhere to go.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WritePlan {
    pub properties: Map<String, JsonValue>,
    pub skipped: Vec<&'static str>,
}

/// Build the write payload for every canonical field present in `input`.
///
/// Fields absent from the input are left untouched. Unresolved and read-only
/// fields are skipped. When two fields land on one property the first wins.
pub fn plan_write(
    fields: &[CanonicalField],
    input: &Map<String, JsonValue>,
    resolved: &ResolvedFieldMap,
) -> Result<WritePlan, BuildError> {
    let mut plan = WritePlan::default();
    for field in fields {
        let Some(raw) = input.get(field.key) else {
            continue;
        };
        let Some(target) = resolved.write_target(field.key) else {
            debug!(field = field.key, "no property to write; skipping");
            plan.skipped.push(field.key);
            continue;
        };
        if plan.properties.contains_key(&target.name) {
            plan.skipped.push(field.key);
            continue;
        }
        match build(field.key, raw, &target.property_type) {
            Ok(payload) => {
                plan.properties.insert(target.name.clone(), payload);
            }
            Err(BuildError::ReadOnly { property_type, .. }) => {
                debug!(field = field.key, %property_type, "read-only property; skipping");
                plan.skipped.push(field.key);
            }
            Err(err) => return Err(err),
        }
    }
    Ok(plan)
}
