//! Axum JSON API for MiniVault. Every route lives under `/api`.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path as AxumPath, Query, State,
    },
    http::{header::AUTHORIZATION, HeaderMap},
    routing::{get, post},
    Json, Router,
};
use minivault_core::{preview_target, RecordKind, CATALOG};
use minivault_service::{BootstrapRequest, ListQuery, MiniVault, MiniVaultConfig, WeeklyReportRequest};
use serde::Deserialize;
use serde_json::{json, Map, Value as JsonValue};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod error;

pub use error::ApiError;

pub const CRATE_NAME: &str = "minivault-web";

type ApiResult = Result<Json<JsonValue>, ApiError>;

#[derive(Clone)]
pub struct AppState {
    pub vault: MiniVault,
}

impl AppState {
    pub fn new(vault: MiniVault) -> Self {
        Self { vault }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self::new(MiniVault::from_env()?))
    }
}

#[derive(Debug, Deserialize, Default)]
struct PreviewQuery {
    url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct OverviewQuery {
    repo: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct DriveQuery {
    folder_id: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GmailQuery {
    q: Option<String>,
    max_results: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SalesQuery {
    database_id: Option<String>,
}

pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/api/health", get(health_handler))
        .route(
            "/api/documents/{id}/content",
            get(document_content_handler).patch(document_append_handler),
        )
        .route("/api/preview", get(preview_handler))
        .route("/api/github/overview", get(github_overview_handler))
        .route("/api/drive/files", get(drive_files_handler))
        .route("/api/gmail/messages", get(gmail_messages_handler))
        .route("/api/reports/weekly", post(weekly_report_handler))
        .route("/api/projects/bootstrap", post(bootstrap_handler))
        .route("/api/sales/summary", get(sales_summary_handler));
    for kind in CATALOG.iter().copied() {
        router = router.merge(record_routes(kind));
    }
    router
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// `GET`/`POST /api/{slug}` and `PATCH`/`DELETE /api/{slug}/{id}` for one record kind.
fn record_routes(kind: &'static RecordKind) -> Router<Arc<AppState>> {
    let collection = format!("/api/{}", kind.slug);
    let item = format!("/api/{}/{{id}}", kind.slug);
    Router::new()
        .route(
            &collection,
            get(
                move |State(state): State<Arc<AppState>>, query: Result<Query<ListQuery>, QueryRejection>| async move {
                    list_records(&state, kind, query).await
                },
            )
            .post(
                move |State(state): State<Arc<AppState>>, body: Result<Json<JsonValue>, JsonRejection>| async move {
                    create_record(&state, kind, body).await
                },
            ),
        )
        .route(
            &item,
            axum::routing::patch(
                move |State(state): State<Arc<AppState>>,
                      AxumPath(id): AxumPath<String>,
                      body: Result<Json<JsonValue>, JsonRejection>| async move {
                    update_record(&state, kind, &id, body).await
                },
            )
            .delete(
                move |State(state): State<Arc<AppState>>, AxumPath(id): AxumPath<String>| async move {
                    archive_record(&state, kind, &id).await
                },
            ),
        )
}

pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(%port, "minivault listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

pub async fn serve_from_env() -> anyhow::Result<()> {
    let config = MiniVaultConfig::from_env();
    let port = config.port;
    serve(AppState::new(MiniVault::new(config)?), port).await
}

/// Token from `Authorization: Bearer …`, if any.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

fn object_body(body: Result<Json<JsonValue>, JsonRejection>) -> Result<Map<String, JsonValue>, ApiError> {
    match body? {
        Json(JsonValue::Object(map)) => Ok(map),
        Json(_) => Err(ApiError::bad_request("JSON body must be an object")),
    }
}

async fn list_records(state: &AppState, kind: &RecordKind, query: Result<Query<ListQuery>, QueryRejection>) -> ApiResult {
    let Query(query) = query?;
    let records = state.vault.list_records(kind, &query).await?;
    Ok(Json(json!({ kind.list_key: records })))
}

async fn create_record(state: &AppState, kind: &RecordKind, body: Result<Json<JsonValue>, JsonRejection>) -> ApiResult {
    let body = object_body(body)?;
    let page = state.vault.create_record(kind, &body).await?;
    Ok(Json(json!({ "success": true, kind.singular_key: page })))
}

async fn update_record(
    state: &AppState,
    kind: &RecordKind,
    id: &str,
    body: Result<Json<JsonValue>, JsonRejection>,
) -> ApiResult {
    let body = object_body(body)?;
    let page = state.vault.update_record(kind, id, &body).await?;
    Ok(Json(json!({ "success": true, kind.singular_key: page })))
}

async fn archive_record(state: &AppState, kind: &RecordKind, id: &str) -> ApiResult {
    let id = state.vault.archive_record(kind, id).await?;
    Ok(Json(json!({ "success": true, "id": id })))
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<JsonValue> {
    Json(json!({
        "status": "ok",
        "integrations": state.vault.config().integrations(),
    }))
}

async fn document_content_handler(State(state): State<Arc<AppState>>, AxumPath(id): AxumPath<String>) -> ApiResult {
    let blocks = state.vault.document_content(&id).await?;
    Ok(Json(json!({ "blocks": blocks })))
}

async fn document_append_handler(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
    body: Result<Json<JsonValue>, JsonRejection>,
) -> ApiResult {
    let body = object_body(body)?;
    let text = body.get("text").and_then(JsonValue::as_str);
    let appended = state.vault.append_document_text(&id, text).await?;
    Ok(Json(json!({ "success": true, "appended": appended })))
}

async fn preview_handler(query: Result<Query<PreviewQuery>, QueryRejection>) -> ApiResult {
    let Query(query) = query?;
    let url = query
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing required field: url"))?;
    let body = match preview_target(&url) {
        Some(target) => json!({ "previewable": true, "kind": target.kind, "id": target.id }),
        None => json!({ "previewable": false, "kind": null, "id": null }),
    };
    Ok(Json(body))
}

async fn github_overview_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<OverviewQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    let overview = state
        .vault
        .github_overview(bearer_token(&headers), query.repo.as_deref(), query.limit)
        .await?;
    Ok(Json(json!(overview)))
}

async fn drive_files_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<DriveQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    let files = state
        .vault
        .drive_files(bearer_token(&headers), query.folder_id.as_deref())
        .await?;
    Ok(Json(json!({ "files": files })))
}

async fn gmail_messages_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<GmailQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    let messages = state
        .vault
        .gmail_messages(bearer_token(&headers), query.q.as_deref(), query.max_results)
        .await?;
    Ok(Json(json!({ "messages": messages })))
}

async fn weekly_report_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<WeeklyReportRequest>, JsonRejection>,
) -> ApiResult {
    let Json(request) = body?;
    let report = state.vault.weekly_report(bearer_token(&headers), &request).await?;
    Ok(Json(json!(report)))
}

async fn bootstrap_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<BootstrapRequest>, JsonRejection>,
) -> ApiResult {
    let Json(request) = body?;
    let result = state.vault.bootstrap_project(&request).await?;
    Ok(Json(json!(result)))
}

async fn sales_summary_handler(
    State(state): State<Arc<AppState>>,
    query: Result<Query<SalesQuery>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    let summary = state.vault.sales_summary(query.database_id.as_deref()).await?;
    Ok(Json(json!(summary)))
}
