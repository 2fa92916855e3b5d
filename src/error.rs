//! Error types for the Folio server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use folio::{ContainerError, FetchError};

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Fetch(e) => match e {
                FetchError::MissingResource(path) => (
                    StatusCode::NOT_FOUND,
                    "not_found",
                    format!("Resource not declared: {}", path),
                ),
                FetchError::Container(ContainerError::NotFound(path)) => (
                    StatusCode::NOT_FOUND,
                    "not_found",
                    format!("Entry not found: {}", path),
                ),
                FetchError::Container(ContainerError::InvalidPath(path)) => (
                    StatusCode::BAD_REQUEST,
                    "bad_request",
                    format!("Invalid path: {}", path),
                ),
                _ => {
                    tracing::error!("Fetch error: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "fetch_error",
                        "Failed to fetch resource".to_string(),
                    )
                }
            },
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}
