use minivault_core::{DatabaseSchema, PropertyType};
use serde_json::{json, Map, Value as JsonValue};
use tracing::debug;

/// Property configuration for `POST /databases`, derived from a template database.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreationSchema {
    pub properties: Map<String, JsonValue>,
    /// Template properties that cannot be recreated on a fresh database.
    pub skipped: Vec<String>,
}

pub fn creation_properties(template: &DatabaseSchema) -> CreationSchema {
    let mut schema = CreationSchema::default();
    for (name, descriptor) in &template.properties {
        let raw = template.raw_properties.get(name);
        match creation_config(&descriptor.property_type, raw) {
            Some(config) => {
                schema.properties.insert(name.clone(), config);
            }
            None => {
                debug!(property = %name, property_type = %descriptor.property_type, "dropping template property");
                schema.skipped.push(name.clone());
            }
        }
    }
    schema
}

fn creation_config(ty: &PropertyType, raw: Option<&JsonValue>) -> Option<JsonValue> {
    let section = |tag: &str| raw.and_then(|r| r.get(tag));
    let config = match ty {
        PropertyType::Number => {
            let format = section("number")
                .and_then(|c| c.get("format"))
                .cloned()
                .unwrap_or_else(|| json!("number"));
            json!({ "number": { "format": format } })
        }
        PropertyType::Select => json!({ "select": { "options": options(section("select")) } }),
        PropertyType::MultiSelect => {
            json!({ "multi_select": { "options": options(section("multi_select")) } })
        }
        // status properties cannot be created through the API
        PropertyType::Status => json!({ "select": { "options": options(section("status")) } }),
        PropertyType::Formula => {
            let expression = section("formula").and_then(|c| c.get("expression")).cloned()?;
            json!({ "formula": { "expression": expression } })
        }
        PropertyType::Rollup => return None,
        PropertyType::Other(tag) if tag == "relation" => return None,
        PropertyType::Other(tag) => {
            // people, files and the like take an empty configuration
            if matches!(tag.as_str(), "people" | "files" | "created_by" | "last_edited_by") {
                json!({ tag.as_str(): {} })
            } else {
                return None;
            }
        }
        simple => json!({ simple.as_tag(): {} }),
    };
    Some(config)
}

/// Options without their template-specific ids.
fn options(config: Option<&JsonValue>) -> Vec<JsonValue> {
    config
        .and_then(|c| c.get("options"))
        .and_then(JsonValue::as_array)
        .map(|options| {
            options
                .iter()
                .filter_map(|option| {
                    let name = option.get("name")?.as_str()?;
                    let mut out = json!({ "name": name });
                    if let Some(color) = option.get("color").and_then(JsonValue::as_str) {
                        out["color"] = json!(color);
                    }
                    Some(out)
                })
                .collect()
        })
        .unwrap_or_default()
}
