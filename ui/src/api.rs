use crate::log_buffer::RollingLog;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use quorum_fs::client::agent::CacheAgent;
use quorum_fs::protocol::types::Response;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<CacheAgent>,
    pub log: Arc<RollingLog>,
}

#[derive(Serialize)]
pub struct ServerInfo {
    name: String,
    host: String,
    port: u16,
}

#[derive(Serialize)]
pub struct StatusResponse {
    status: &'static str,
    servers: Vec<ServerInfo>,
}

#[derive(Serialize)]
pub struct FilesResponse {
    files: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct FileResponse {
    pub filename: String,
    pub content: String,
    pub source: String,
}

#[derive(Deserialize)]
pub struct WriteRequest {
    pub filename: String,
    pub content: String,
}

#[derive(Serialize)]
pub struct LogsResponse {
    logs: Vec<String>,
}

/// Builds the `/api` router. Any origin may call it, so a browser UI served
/// from another port can reach the façade.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(api_status))
        .route("/api/files", get(api_files).post(api_write_file))
        .route("/api/files/:filename", get(api_read_file))
        .route("/api/logs", get(api_logs))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn api_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let servers = state
        .agent
        .config()
        .nodes
        .iter()
        .map(|node| ServerInfo {
            name: node.id.to_string(),
            host: node.host.clone(),
            port: node.port,
        })
        .collect();

    Json(StatusResponse {
        status: "Online",
        servers,
    })
}

/// Lists the files the cluster knows a primary for.
pub async fn api_files(State(state): State<AppState>) -> Json<FilesResponse> {
    let files = state
        .agent
        .config()
        .ownership
        .files()
        .map(str::to_string)
        .collect();

    Json(FilesResponse { files })
}

pub async fn api_read_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<FileResponse>, (StatusCode, String)> {
    match state.agent.read(&filename).await {
        Ok(outcome) => {
            state
                .log
                .push(format!("Read {} from {}", filename, outcome.source));
            Ok(Json(FileResponse {
                filename,
                content: outcome.content,
                source: outcome.source.to_string(),
            }))
        }
        Err(e) => {
            tracing::warn!("Read of {} failed: {}", filename, e);
            Err((
                StatusCode::NOT_FOUND,
                "File not found or error".to_string(),
            ))
        }
    }
}

pub async fn api_write_file(
    State(state): State<AppState>,
    Json(req): Json<WriteRequest>,
) -> Result<Json<Response>, (StatusCode, String)> {
    let message = match state.agent.write(&req.filename, &req.content).await {
        Ok(response) if response.is_ok() => {
            state
                .log
                .push(format!("Wrote {} (Quorum Met)", req.filename));
            return Ok(Json(response));
        }
        Ok(response) => response.message_or_default().to_string(),
        Err(e) => e.to_string(),
    };

    state
        .log
        .push(format!("Write Failed: {} - {}", req.filename, message));
    Err((StatusCode::INTERNAL_SERVER_ERROR, message))
}

pub async fn api_logs(State(state): State<AppState>) -> Json<LogsResponse> {
    Json(LogsResponse {
        logs: state.log.entries(),
    })
}
