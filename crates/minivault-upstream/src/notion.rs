//! Thin Notion REST wrapper: auth header, version header, base URL, dashless IDs.

use std::collections::HashSet;

use minivault_core::parse_notion_id;
use reqwest::Method;
use serde_json::{json, Map, Value as JsonValue};
use tracing::{debug, info_span, Instrument};

use crate::{read_json, transport, Service, UpstreamError};

pub const NOTION_API_BASE: &str = "https://api.notion.com/v1";
pub const NOTION_VERSION: &str = "2022-06-28";

const PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone)]
pub struct NotionClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

/// One page of `POST /databases/{id}/query` results.
#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    pub results: Vec<JsonValue>,
    pub next_cursor: Option<String>,
}

impl NotionClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    async fn send(
        &self,
        method: Method,
        path: String,
        query: &[(&str, &str)],
        body: Option<JsonValue>,
    ) -> Result<JsonValue, UpstreamError> {
        let span = info_span!("notion_request", %method, path = %path);
        async move {
            let mut request = self
                .http
                .request(method, format!("{}{}", self.base_url, path))
                .bearer_auth(&self.token)
                .header("Notion-Version", NOTION_VERSION);
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = &body {
                request = request.json(body);
            }
            let resp = request.send().await.map_err(transport(Service::Notion))?;
            debug!(status = resp.status().as_u16(), "notion responded");
            read_json(Service::Notion, resp).await
        }
        .instrument(span)
        .await
    }

    pub async fn retrieve_database(&self, database_id: &str) -> Result<JsonValue, UpstreamError> {
        let path = format!("/databases/{}", path_id(database_id)?);
        self.send(Method::GET, path, &[], None).await
    }

    pub async fn query_database(
        &self,
        database_id: &str,
        sorts: Option<&JsonValue>,
        start_cursor: Option<&str>,
    ) -> Result<QueryPage, UpstreamError> {
        let path = format!("/databases/{}/query", path_id(database_id)?);
        let mut body = Map::new();
        body.insert("page_size".into(), json!(PAGE_SIZE));
        if let Some(sorts) = sorts {
            body.insert("sorts".into(), sorts.clone());
        }
        if let Some(cursor) = start_cursor {
            body.insert("start_cursor".into(), json!(cursor));
        }
        let value = self
            .send(Method::POST, path, &[], Some(JsonValue::Object(body)))
            .await?;
        Ok(parse_list_page(value))
    }

    /// Follow `next_cursor` until the database is exhausted.
    pub async fn query_all(
        &self,
        database_id: &str,
        sorts: Option<&JsonValue>,
    ) -> Result<Vec<JsonValue>, UpstreamError> {
        let mut pages = Vec::new();
        let mut cursors = Cursors::default();
        loop {
            let page = self
                .query_database(database_id, sorts, cursors.current())
                .await?;
            pages.extend(page.results);
            if !cursors.advance(page.next_cursor)? {
                break;
            }
        }
        Ok(pages)
    }

    pub async fn create_page(
        &self,
        database_id: &str,
        properties: Map<String, JsonValue>,
    ) -> Result<JsonValue, UpstreamError> {
        let body = json!({
            "parent": { "database_id": path_id(database_id)? },
            "properties": properties,
        });
        self.send(Method::POST, "/pages".to_string(), &[], Some(body))
            .await
    }

    pub async fn update_page(
        &self,
        page_id: &str,
        properties: Map<String, JsonValue>,
    ) -> Result<JsonValue, UpstreamError> {
        let path = format!("/pages/{}", path_id(page_id)?);
        self.send(Method::PATCH, path, &[], Some(json!({ "properties": properties })))
            .await
    }

    /// Soft delete. Archived pages stay recoverable from Notion's trash.
    pub async fn archive_page(&self, page_id: &str) -> Result<JsonValue, UpstreamError> {
        let path = format!("/pages/{}", path_id(page_id)?);
        self.send(Method::PATCH, path, &[], Some(json!({ "archived": true })))
            .await
    }

    pub async fn retrieve_page(&self, page_id: &str) -> Result<JsonValue, UpstreamError> {
        let path = format!("/pages/{}", path_id(page_id)?);
        self.send(Method::GET, path, &[], None).await
    }

    pub async fn list_block_children(&self, block_id: &str) -> Result<Vec<JsonValue>, UpstreamError> {
        let path = format!("/blocks/{}/children", path_id(block_id)?);
        let page_size = PAGE_SIZE.to_string();
        let mut blocks = Vec::new();
        let mut cursors = Cursors::default();
        loop {
            let value = {
                let mut query = vec![("page_size", page_size.as_str())];
                if let Some(cursor) = cursors.current() {
                    query.push(("start_cursor", cursor));
                }
                self.send(Method::GET, path.clone(), &query, None).await?
            };
            let page = parse_list_page(value);
            blocks.extend(page.results);
            if !cursors.advance(page.next_cursor)? {
                break;
            }
        }
        Ok(blocks)
    }

    pub async fn append_block_children(
        &self,
        block_id: &str,
        children: Vec<JsonValue>,
    ) -> Result<JsonValue, UpstreamError> {
        let path = format!("/blocks/{}/children", path_id(block_id)?);
        self.send(Method::PATCH, path, &[], Some(json!({ "children": children })))
            .await
    }

    pub async fn create_database(&self, body: JsonValue) -> Result<JsonValue, UpstreamError> {
        self.send(Method::POST, "/databases".to_string(), &[], Some(body))
            .await
    }
}

/// Dashless id, refused unless it is a UUID so nothing else can reach the URL path.
fn path_id(raw: &str) -> Result<String, UpstreamError> {
    parse_notion_id(raw).ok_or_else(|| UpstreamError::InvalidId {
        service: Service::Notion,
        id: raw.to_string(),
    })
}

/// Pagination state. A cursor handed back twice would loop forever, so it is an error.
#[derive(Debug, Default)]
struct Cursors {
    current: Option<String>,
    seen: HashSet<String>,
}

impl Cursors {
    fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// `Ok(false)` once there are no more pages.
    fn advance(&mut self, next: Option<String>) -> Result<bool, UpstreamError> {
        let Some(next) = next else {
            return Ok(false);
        };
        if !self.seen.insert(next.clone()) {
            return Err(UpstreamError::decode(
                Service::Notion,
                format!("pagination cursor `{next}` repeated"),
            ));
        }
        self.current = Some(next);
        Ok(true)
    }
}

fn parse_list_page(value: JsonValue) -> QueryPage {
    let has_more = value
        .get("has_more")
        .and_then(JsonValue::as_bool)
        .unwrap_or(false);
    let next_cursor = value
        .get("next_cursor")
        .and_then(JsonValue::as_str)
        .filter(|_| has_more)
        .map(ToString::to_string);
    let results = match value {
        JsonValue::Object(mut map) => match map.remove("results") {
            Some(JsonValue::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    QueryPage {
        results,
        next_cursor,
    }
}
