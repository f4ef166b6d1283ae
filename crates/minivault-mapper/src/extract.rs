use minivault_core::{PrimitiveValue, PropertyType};
use serde_json::Value as JsonValue;

/// Decode one page property by its type tag. Absent, empty or unknown → `None`.
pub fn extract(property: Option<&JsonValue>) -> Option<PrimitiveValue> {
    let property = property?;
    let tag = property.get("type").and_then(JsonValue::as_str)?;
    let ty = PropertyType::from_tag(tag);
    let payload = property.get(ty.as_tag())?;
    decode(&ty, payload)
}

fn decode(ty: &PropertyType, payload: &JsonValue) -> Option<PrimitiveValue> {
    match ty {
        PropertyType::Title | PropertyType::RichText => first_span_text(payload).map(PrimitiveValue::Text),
        PropertyType::Number => payload.as_f64().map(PrimitiveValue::Number),
        PropertyType::Select | PropertyType::Status => option_name(payload).map(PrimitiveValue::Text),
        PropertyType::MultiSelect => payload.as_array().map(|options| {
            PrimitiveValue::List(
                options
                    .iter()
                    .filter_map(option_name)
                    .collect(),
            )
        }),
        PropertyType::Date => date_start(payload).map(PrimitiveValue::Text),
        PropertyType::Checkbox => payload.as_bool().map(PrimitiveValue::Bool),
        PropertyType::Formula => formula(payload),
        PropertyType::Rollup => rollup(payload),
        PropertyType::Url
        | PropertyType::Email
        | PropertyType::PhoneNumber
        | PropertyType::CreatedTime
        | PropertyType::LastEditedTime => non_empty_str(payload).map(PrimitiveValue::Text),
        PropertyType::Other(_) => None,
    }
}

fn first_span_text(payload: &JsonValue) -> Option<String> {
    let first = payload.as_array()?.first()?;
    first
        .get("plain_text")
        .or_else(|| first.pointer("/text/content"))
        .and_then(non_empty_str)
}

fn option_name(option: &JsonValue) -> Option<String> {
    option.get("name").and_then(non_empty_str)
}

fn date_start(date: &JsonValue) -> Option<String> {
    date.get("start").and_then(non_empty_str)
}

fn non_empty_str(value: &JsonValue) -> Option<String> {
    value
        .as_str()
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

fn formula(payload: &JsonValue) -> Option<PrimitiveValue> {
    let result_type = payload.get("type").and_then(JsonValue::as_str)?;
    let result = payload.get(result_type)?;
    match result_type {
        "string" => non_empty_str(result).map(PrimitiveValue::Text),
        "number" => result.as_f64().map(PrimitiveValue::Number),
        "boolean" => result.as_bool().map(PrimitiveValue::Bool),
        "date" => date_start(result).map(PrimitiveValue::Text),
        _ => None,
    }
}

/// Numeric rollups pass through; array rollups report how many items they hold.
fn rollup(payload: &JsonValue) -> Option<PrimitiveValue> {
    match payload.get("type").and_then(JsonValue::as_str)? {
        "number" => payload.get("number")?.as_f64().map(PrimitiveValue::Number),
        "array" => payload
            .get("array")?
            .as_array()
            .map(|items| PrimitiveValue::Number(items.len() as f64)),
        _ => None,
    }
}
