use std::cmp::Ordering;

use minivault_core::{
    plain_text_of, NormalizedRecord, PageRef, PrimitiveValue, PropertyDescriptor, PropertyType,
    RecordKind,
};
use minivault_mapper::{build, plan_write, project, resolve, SchemaSource};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};
use tracing::{debug, info};

use crate::{notion_id, MiniVault, ServiceError, ServiceResult};

/// Notion accepts at most this many children per append.
const MAX_APPEND_BLOCKS: usize = 100;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub database_id: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockText {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMapping {
    pub key: &'static str,
    pub property: Option<PropertyDescriptor>,
}

/// What a database looks like and how a record kind would map onto it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaReport {
    pub database_id: String,
    pub title: Option<String>,
    pub properties: Vec<PropertyDescriptor>,
    pub fields: Vec<FieldMapping>,
}

impl MiniVault {
    pub async fn list_records(&self, kind: &RecordKind, query: &ListQuery) -> ServiceResult<Vec<NormalizedRecord>> {
        let notion = self.notion()?;
        let database_id = self.database_for(kind, query.database_id.as_deref())?;
        let sort = requested_sort(kind, query)?;

        let sorts = json!([{ "timestamp": "created_time", "direction": "descending" }]);
        let pages = notion.query_all(&database_id, Some(&sorts)).await?;
        let resolved = resolve(&notion, &database_id, kind.fields).await;
        let mut records = project(&pages, &resolved);
        if let Some((key, order)) = sort {
            sort_records(&mut records, &key, order);
        }
        debug!(kind = kind.slug, count = records.len(), "listed records");
        Ok(records)
    }

    pub async fn create_record(&self, kind: &RecordKind, body: &Map<String, JsonValue>) -> ServiceResult<PageRef> {
        let notion = self.notion()?;
        for key in kind.required {
            if is_blank(body.get(*key)) {
                return Err(ServiceError::MissingField((*key).to_string()));
            }
        }
        let database_id = self.database_for(kind, body.get("databaseId").and_then(JsonValue::as_str))?;

        let resolved = resolve(&notion, &database_id, kind.fields).await;
        let plan = plan_write(kind.fields, body, &resolved)?;
        let page = notion.create_page(&database_id, plan.properties).await?;
        let page = PageRef::from_notion(&page);
        info!(kind = kind.slug, page_id = %page.id, skipped = ?plan.skipped, "created record");
        Ok(page)
    }

    /// Without `databaseId` in the body the page's parent database is looked up first.
    pub async fn update_record(
        &self,
        kind: &RecordKind,
        page_id: &str,
        body: &Map<String, JsonValue>,
    ) -> ServiceResult<PageRef> {
        let notion = self.notion()?;
        let page_id = notion_id("pageId", page_id)?;
        let explicit = body
            .get("databaseId")
            .and_then(JsonValue::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty());
        let database_id = match explicit {
            Some(id) => notion_id("databaseId", id)?,
            None => {
                let page = notion.retrieve_page(&page_id).await?;
                let parent = page
                    .pointer("/parent/database_id")
                    .and_then(JsonValue::as_str)
                    .ok_or_else(|| ServiceError::invalid("databaseId", "page is not in a database"))?;
                notion_id("databaseId", parent)?
            }
        };

        let resolved = resolve(&notion, &database_id, kind.fields).await;
        let plan = plan_write(kind.fields, body, &resolved)?;
        let page = notion.update_page(&page_id, plan.properties).await?;
        let page = PageRef::from_notion(&page);
        info!(kind = kind.slug, page_id = %page.id, skipped = ?plan.skipped, "updated record");
        Ok(page)
    }

    /// Archive rather than delete; the page stays in Notion's trash.
    pub async fn archive_record(&self, kind: &RecordKind, page_id: &str) -> ServiceResult<String> {
        let notion = self.notion()?;
        notion.archive_page(&notion_id("pageId", page_id)?).await?;
        info!(kind = kind.slug, %page_id, "archived record");
        Ok(page_id.to_string())
    }

    pub async fn document_content(&self, page_id: &str) -> ServiceResult<Vec<BlockText>> {
        let notion = self.notion()?;
        let blocks = notion.list_block_children(&notion_id("pageId", page_id)?).await?;
        Ok(blocks.iter().map(block_text).collect())
    }

    /// Append one paragraph per non-empty line. Returns how many blocks were added.
    pub async fn append_document_text(&self, page_id: &str, text: Option<&str>) -> ServiceResult<usize> {
        let notion = self.notion()?;
        let page_id = notion_id("pageId", page_id)?;
        let text = text
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ServiceError::MissingField("text".into()))?;

        let mut paragraphs = Vec::new();
        for line in text.lines().map(str::trim_end).filter(|l| !l.trim().is_empty()) {
            let payload = build("text", &json!(line), &PropertyType::RichText)?;
            paragraphs.push(json!({
                "object": "block",
                "type": "paragraph",
                "paragraph": { "rich_text": payload["rich_text"] },
            }));
        }
        let appended = paragraphs.len();
        for chunk in paragraphs.chunks(MAX_APPEND_BLOCKS) {
            notion.append_block_children(&page_id, chunk.to_vec()).await?;
        }
        Ok(appended)
    }

    /// Fetch a schema without degradation; used for diagnostics.
    pub async fn inspect_schema(&self, database_id: &str, kind: Option<&RecordKind>) -> ServiceResult<SchemaReport> {
        let notion = self.notion()?;
        let schema = notion.fetch_schema(&notion_id("databaseId", database_id)?).await?;
        let resolved = kind.map(|k| minivault_mapper::ResolvedFieldMap::from_schema(&schema, k.fields));
        Ok(SchemaReport {
            database_id: schema.id.clone(),
            title: schema.title.clone(),
            properties: schema.properties.values().cloned().collect(),
            fields: resolved
                .map(|r| {
                    r.iter()
                        .map(|f| FieldMapping {
                            key: f.key,
                            property: f.property.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

fn is_blank(value: Option<&JsonValue>) -> bool {
    match value {
        None | Some(JsonValue::Null) => true,
        Some(JsonValue::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

fn requested_sort(kind: &RecordKind, query: &ListQuery) -> ServiceResult<Option<(String, SortOrder)>> {
    let order = match query.order.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("asc") => SortOrder::Asc,
        Some("desc") => SortOrder::Desc,
        Some(_) => return Err(ServiceError::invalid("order", "expected `asc` or `desc`")),
    };
    let Some(key) = query.sort_by.as_deref().map(str::trim).filter(|k| !k.is_empty()) else {
        return Ok(None);
    };
    let known = kind.field(key).is_some() || matches!(key, "createdTime" | "lastEditedTime");
    if !known {
        return Err(ServiceError::invalid("sortBy", format!("unknown field `{key}`")));
    }
    Ok(Some((key.to_string(), order)))
}

/// Stable sort; records without a value always go last.
fn sort_records(records: &mut [NormalizedRecord], key: &str, order: SortOrder) {
    let value_of = |record: &NormalizedRecord| -> Option<PrimitiveValue> {
        match key {
            "createdTime" => record.created_time.clone().map(PrimitiveValue::Text),
            "lastEditedTime" => record.last_edited_time.clone().map(PrimitiveValue::Text),
            _ => record.get(key).cloned(),
        }
    };
    records.sort_by(|a, b| match (value_of(a), value_of(b)) {
        (Some(x), Some(y)) => {
            let ord = compare_values(&x, &y);
            match order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

fn compare_values(a: &PrimitiveValue, b: &PrimitiveValue) -> Ordering {
    match (a, b) {
        (PrimitiveValue::Number(x), PrimitiveValue::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (PrimitiveValue::Text(x), PrimitiveValue::Text(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
        (PrimitiveValue::Bool(x), PrimitiveValue::Bool(y)) => x.cmp(y),
        (PrimitiveValue::List(x), PrimitiveValue::List(y)) => x.len().cmp(&y.len()),
        _ => Ordering::Equal,
    }
}

fn block_text(block: &JsonValue) -> BlockText {
    let block_type = block
        .get("type")
        .and_then(JsonValue::as_str)
        .unwrap_or("unsupported")
        .to_string();
    let text = block
        .get(&block_type)
        .and_then(|body| body.get("rich_text"))
        .and_then(plain_text_of);
    BlockText {
        id: block
            .get("id")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string(),
        block_type,
        text,
    }
}
