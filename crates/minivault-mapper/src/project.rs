use std::collections::BTreeMap;

use minivault_core::{FieldRole, NormalizedRecord, PrimitiveValue};
use serde_json::Value as JsonValue;

use crate::{extract, ResolvedFieldMap};

/// Display title for pages whose title is missing or blank.
pub const UNTITLED: &str = "Untitled";

/// Project pages into flat records. Output order equals input order.
pub fn project(pages: &[JsonValue], resolved: &ResolvedFieldMap) -> Vec<NormalizedRecord> {
    pages.iter().map(|page| project_page(page, resolved)).collect()
}

pub fn project_page(page: &JsonValue, resolved: &ResolvedFieldMap) -> NormalizedRecord {
    let properties = page.get("properties");
    let mut fields = BTreeMap::new();
    for field in resolved.iter() {
        let value = field
            .property
            .as_ref()
            .and_then(|p| extract(properties.and_then(|props| props.get(&p.name))));
        let value = match (field.role, value) {
            (FieldRole::Title, None) => Some(PrimitiveValue::Text(UNTITLED.to_string())),
            (_, value) => value,
        };
        fields.insert(field.key.to_string(), value);
    }

    NormalizedRecord {
        id: envelope_str(page, "id").unwrap_or_default(),
        url: envelope_str(page, "url").unwrap_or_default(),
        created_time: envelope_str(page, "created_time"),
        last_edited_time: envelope_str(page, "last_edited_time"),
        fields,
    }
}

fn envelope_str(page: &JsonValue, key: &str) -> Option<String> {
    page.get(key)
        .and_then(JsonValue::as_str)
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use minivault_core::catalog::{ESSENTIALS, TASKS};
    use minivault_core::PropertyType;
    use serde_json::json;

    use crate::resolve::tests::schema;

    fn page(id: &str, title: &str) -> JsonValue {
        json!({
            "object": "page",
            "id": id,
            "url": format!("https://www.notion.so/{id}"),
            "created_time": "2026-10-01T09:00:00.000Z",
            "last_edited_time": "2026-10-02T09:00:00.000Z",
            "properties": {
                "Name": { "type": "title", "title": [{ "plain_text": title }] },
                "Status": { "type": "select", "select": { "name": "Todo" } },
                "Tags": { "type": "multi_select", "multi_select": [] }
            }
        })
    }

    #[test]
    fn keeps_input_order_and_envelope() {
        let resolved = ResolvedFieldMap::from_schema(
            &schema(&[
                ("Name", PropertyType::Title),
                ("Status", PropertyType::Select),
                ("Tags", PropertyType::MultiSelect),
            ]),
            TASKS.fields,
        );
        let pages = vec![page("b", "Second"), page("a", "First")];
        let records = project(&pages, &resolved);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "b");
        assert_eq!(records[1].text("title"), Some("First"));
        assert_eq!(records[0].url, "https://www.notion.so/b");
        assert_eq!(records[0].created_time.as_deref(), Some("2026-10-01T09:00:00.000Z"));
        assert_eq!(records[0].text("status"), Some("Todo"));
        assert_eq!(records[0].get("tags"), Some(&PrimitiveValue::List(vec![])));
        // unresolved fields are present and null
        assert_eq!(records[0].fields.get("priority"), Some(&None));
    }

    #[test]
    fn blank_or_missing_title_is_untitled() {
        let resolved = ResolvedFieldMap::from_schema(&schema(&[("Name", PropertyType::Title)]), ESSENTIALS.fields);
        let blank = page("p1", "");
        assert_eq!(project_page(&blank, &resolved).text("title"), Some(UNTITLED));

        let unavailable = ResolvedFieldMap::unavailable("db", ESSENTIALS.fields);
        let record = project_page(&page("p2", "Real"), &unavailable);
        assert_eq!(record.text("title"), Some(UNTITLED));
        assert_eq!(record.fields.get("category"), Some(&None));
    }
}
