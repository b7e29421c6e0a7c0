use std::sync::LazyLock;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use docwright_common::{
    ChatExportRequest, DOCX_MIME_TYPE, DocumentRequest, MCP_PROTOCOL_VERSION, SERVICE_NAME,
    TemplateName, Validate, parse_request,
};
use docwright_mcp::catalog_json;
use docwright_store::DocumentRecord;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::info;

use crate::AppState;
use crate::error::ApiError;

// 本文の不備はすべて 400 (axum の Json 抽出だと 422 になる)
fn parse_body<T: DeserializeOwned + Validate>(body: &[u8]) -> Result<T, ApiError> {
    let value: Value = serde_json::from_slice(body)?;
    Ok(parse_request(value)?)
}

static DESCRIPTOR: LazyLock<Value> = LazyLock::new(|| {
    let templates: Vec<&str> = TemplateName::ALL.iter().map(|t| t.as_str()).collect();
    json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "GET /health",
            "tools": "GET /tools",
            "create": "POST /word/create",
            "createFromChat": "POST /word/create-from-chat",
            "list": "GET /word/list",
            "download": "GET /word/download/{filename}",
            "delete": "DELETE /word/delete/{filename}",
            "mcp": "POST /mcp",
        },
        "supportedFormats": ["docx"],
        "templates": templates,
        "mcpVersion": MCP_PROTOCOL_VERSION,
    })
});

pub async fn describe() -> Json<Value> {
    Json(DESCRIPTOR.clone())
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let repository = state.service.repository();
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "timestamp": Utc::now().with_timezone(&repository.timezone()).to_rfc3339(),
        "documentsDirectory": repository.root().display().to_string(),
    }))
}

pub async fn tools() -> Json<Value> {
    Json(catalog_json().clone())
}

pub async fn create_document(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<DocumentRecord>, ApiError> {
    let request: DocumentRequest = parse_body(&body)?;
    let record = state.service.create_document(request).await?;
    Ok(Json(record))
}

pub async fn create_from_chat(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<DocumentRecord>, ApiError> {
    let request: ChatExportRequest = parse_body(&body)?;
    let record = state.service.create_from_chat(request).await?;
    Ok(Json(record))
}

pub async fn list_documents(
    State(state): State<AppState>,
) -> Result<Json<Vec<DocumentRecord>>, ApiError> {
    Ok(Json(state.service.list_documents().await?))
}

pub async fn download_document(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let bytes = state.service.fetch_document(&filename).await?;
    info!("Serving {filename} ({} bytes)", bytes.len());
    let headers = [
        (header::CONTENT_TYPE, DOCX_MIME_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
    ];
    Ok((headers, bytes).into_response())
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.service.delete_document(&filename).await?;
    Ok(Json(json!({ "deleted": true, "filename": filename })))
}

/// JSON-RPC errors travel in the body, so this route only ever answers 200
/// or 204.
pub async fn mcp(State(state): State<AppState>, body: String) -> Response {
    match state.mcp.handle_body(&body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
