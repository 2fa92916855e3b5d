//! Publication resource routes
//!
//! Serves the manifest and individual resources through the fetcher. Archive
//! reads and filtering are blocking, so they run on the blocking pool.

use std::io::Read;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use folio::Publication;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Create the publication router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/manifest.json", get(manifest))
        .route("/resources/*path", get(serve_resource))
        .route("/length/*path", get(resource_length))
}

/// How a resource is read from the fetcher
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    #[default]
    Stream,
    Buffered,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResourceQuery {
    #[serde(default)]
    pub mode: AccessMode,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LengthResponse {
    pub href: String,
    pub length: u64,
}

async fn manifest(State(state): State<AppState>) -> Json<Publication> {
    Json(state.fetcher().publication().clone())
}

/// Serve a single resource
async fn serve_resource(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(query): Query<ResourceQuery>,
) -> Result<Response> {
    let href = path.clone();
    let bytes = tokio::task::spawn_blocking(move || read_resource(&state, &href, query.mode))
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))??;

    let content_type = mime_guess::from_path(&path)
        .first_or_octet_stream()
        .to_string();

    tracing::debug!(path = %path, mode = ?query.mode, size = bytes.len(), "Serving resource");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, bytes.len())
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(e.to_string()))
}

fn read_resource(state: &AppState, path: &str, mode: AccessMode) -> Result<Vec<u8>> {
    match mode {
        AccessMode::Buffered => state
            .fetcher()
            .fetch(path)?
            .ok_or_else(|| AppError::NotFound(format!("Resource not found: {}", path))),
        AccessMode::Stream => {
            let mut stream = state.fetcher().fetch_stream(path)?;
            let mut bytes = Vec::new();
            stream
                .read_to_end(&mut bytes)
                .map_err(|e| AppError::Internal(format!("Failed to read resource stream: {}", e)))?;
            Ok(bytes)
        }
    }
}

/// Stored length of a declared resource
async fn resource_length(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Json<LengthResponse>> {
    let href = path.clone();
    let length = tokio::task::spawn_blocking(move || state.fetcher().length(&href))
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))??;

    Ok(Json(LengthResponse { href: path, length }))
}
