//! Core data model for MiniVault: Notion schema shapes, normalized records, ID helpers.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub mod catalog;
pub mod ids;

pub use catalog::{record_kind, CanonicalField, FallbackProperty, FieldRole, RecordKind, CATALOG};
pub use ids::{normalize_id, parse_notion_id, preview_target, PreviewKind, PreviewTarget};

pub const CRATE_NAME: &str = "minivault-core";

/// Notion property type tag, as reported by the database schema and page properties.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PropertyType {
    Title,
    RichText,
    Number,
    Select,
    MultiSelect,
    Date,
    Checkbox,
    Url,
    Email,
    PhoneNumber,
    Status,
    Formula,
    Rollup,
    CreatedTime,
    LastEditedTime,
    Other(String),
}

impl PropertyType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "title" => Self::Title,
            "rich_text" => Self::RichText,
            "number" => Self::Number,
            "select" => Self::Select,
            "multi_select" => Self::MultiSelect,
            "date" => Self::Date,
            "checkbox" => Self::Checkbox,
            "url" => Self::Url,
            "email" => Self::Email,
            "phone_number" => Self::PhoneNumber,
            "status" => Self::Status,
            "formula" => Self::Formula,
            "rollup" => Self::Rollup,
            "created_time" => Self::CreatedTime,
            "last_edited_time" => Self::LastEditedTime,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_tag(&self) -> &str {
        match self {
            Self::Title => "title",
            Self::RichText => "rich_text",
            Self::Number => "number",
            Self::Select => "select",
            Self::MultiSelect => "multi_select",
            Self::Date => "date",
            Self::Checkbox => "checkbox",
            Self::Url => "url",
            Self::Email => "email",
            Self::PhoneNumber => "phone_number",
            Self::Status => "status",
            Self::Formula => "formula",
            Self::Rollup => "rollup",
            Self::CreatedTime => "created_time",
            Self::LastEditedTime => "last_edited_time",
            Self::Other(tag) => tag,
        }
    }

    /// Types Notion computes itself; writes against them are rejected upstream.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Self::Formula | Self::Rollup | Self::CreatedTime | Self::LastEditedTime
        )
    }
}

impl From<String> for PropertyType {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl From<PropertyType> for String {
    fn from(value: PropertyType) -> Self {
        value.as_tag().to_string()
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
}

impl PropertyDescriptor {
    pub fn new(name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            property_type,
        }
    }
}

/// Schema of one Notion database, read fresh for every request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DatabaseSchema {
    pub id: String,
    pub title: Option<String>,
    pub url: Option<String>,
    pub properties: BTreeMap<String, PropertyDescriptor>,
    /// Property configuration objects exactly as Notion returned them.
    pub raw_properties: BTreeMap<String, JsonValue>,
}

impl DatabaseSchema {
    /// Parse a `GET /databases/{id}` response. Unknown or missing parts are left empty.
    pub fn from_notion(value: &JsonValue) -> Self {
        let mut properties = BTreeMap::new();
        let mut raw_properties = BTreeMap::new();
        if let Some(map) = value.get("properties").and_then(JsonValue::as_object) {
            for (key, prop) in map {
                let Some(tag) = prop.get("type").and_then(JsonValue::as_str) else {
                    continue;
                };
                let name = prop
                    .get("name")
                    .and_then(JsonValue::as_str)
                    .unwrap_or(key)
                    .to_string();
                properties.insert(
                    name.clone(),
                    PropertyDescriptor::new(name.clone(), PropertyType::from_tag(tag)),
                );
                raw_properties.insert(name, prop.clone());
            }
        }

        Self {
            id: value
                .get("id")
                .and_then(JsonValue::as_str)
                .map(normalize_id)
                .unwrap_or_default(),
            title: value.get("title").and_then(plain_text_of),
            url: value
                .get("url")
                .and_then(JsonValue::as_str)
                .map(ToString::to_string),
            properties,
            raw_properties,
        }
    }

    pub fn get(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.get(name)
    }

    /// The database's unique `title` property.
    pub fn title_property(&self) -> Option<&PropertyDescriptor> {
        self.properties
            .values()
            .find(|p| p.property_type == PropertyType::Title)
    }
}

/// Concatenated `plain_text` of a rich-text array, `None` when blank.
pub fn plain_text_of(rich_text: &JsonValue) -> Option<String> {
    let text = rich_text
        .as_array()?
        .iter()
        .filter_map(|span| {
            span.get("plain_text")
                .and_then(JsonValue::as_str)
                .or_else(|| span.pointer("/text/content").and_then(JsonValue::as_str))
        })
        .collect::<String>();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// A decoded property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimitiveValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl PrimitiveValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// Flat application record keyed by canonical field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRecord {
    pub id: String,
    pub url: String,
    pub created_time: Option<String>,
    pub last_edited_time: Option<String>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Option<PrimitiveValue>>,
}

impl NormalizedRecord {
    /// Serialized names of the page envelope; field keys must never reuse them.
    pub const ENVELOPE_KEYS: &'static [&'static str] = &["id", "url", "createdTime", "lastEditedTime"];

    pub fn get(&self, key: &str) -> Option<&PrimitiveValue> {
        self.fields.get(key).and_then(Option::as_ref)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PrimitiveValue::as_text)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(PrimitiveValue::as_number)
    }
}

/// Identity of a page or database that was just written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    pub id: String,
    pub url: String,
}

impl PageRef {
    pub fn from_notion(value: &JsonValue) -> Self {
        Self {
            id: value
                .get("id")
                .and_then(JsonValue::as_str)
                .unwrap_or_default()
                .to_string(),
            url: value
                .get("url")
                .and_then(JsonValue::as_str)
                .unwrap_or_default()
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn schema_parses_properties_and_title() {
        let schema = DatabaseSchema::from_notion(&json!({
            "object": "database",
            "id": "1b2c3d4e-5f60-4718-8a9b-0c1d2e3f4a5b",
            "title": [{ "plain_text": "Tasks" }],
            "properties": {
                "Name": { "id": "title", "name": "Name", "type": "title", "title": {} },
                "Status": { "id": "a", "name": "Status", "type": "rich_text", "rich_text": {} },
                "Owner": { "id": "b", "name": "Owner", "type": "people", "people": {} }
            }
        }));

        assert_eq!(schema.id, "1b2c3d4e5f6047188a9b0c1d2e3f4a5b");
        assert_eq!(schema.title.as_deref(), Some("Tasks"));
        assert_eq!(schema.title_property().map(|p| p.name.as_str()), Some("Name"));
        assert_eq!(
            schema.get("Status").map(|p| &p.property_type),
            Some(&PropertyType::RichText)
        );
        assert_eq!(
            schema.get("Owner").map(|p| &p.property_type),
            Some(&PropertyType::Other("people".into()))
        );
        assert!(schema.raw_properties.contains_key("Owner"));
    }

    #[test]
    fn property_type_tags_round_trip_through_serde() {
        let ty: PropertyType = serde_json::from_value(json!("multi_select")).unwrap();
        assert_eq!(ty, PropertyType::MultiSelect);
        assert_eq!(serde_json::to_value(&ty).unwrap(), json!("multi_select"));
        assert!(PropertyType::Rollup.is_read_only());
        assert!(!PropertyType::Status.is_read_only());
    }

    #[test]
    fn record_serializes_flat_with_nulls() {
        let mut fields = BTreeMap::new();
        fields.insert("title".to_string(), Some(PrimitiveValue::Text("Ship".into())));
        fields.insert("tags".to_string(), Some(PrimitiveValue::List(vec![])));
        fields.insert("priority".to_string(), None);
        let record = NormalizedRecord {
            id: "p1".into(),
            url: "https://www.notion.so/p1".into(),
            created_time: Some("2026-01-01T00:00:00.000Z".into()),
            last_edited_time: None,
            fields,
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["title"], json!("Ship"));
        assert_eq!(value["tags"], json!([]));
        assert_eq!(value["priority"], JsonValue::Null);
        assert_eq!(value["createdTime"], json!("2026-01-01T00:00:00.000Z"));
        assert_eq!(value["lastEditedTime"], JsonValue::Null);
    }
}
