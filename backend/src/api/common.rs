//! Error handling utilities for API responses.
//!
//! Provides the single canonical mapping from service-layer errors to HTTP
//! responses. Every handler routes failures through `service_error_to_http`:
//!
//! - `Validation` / `AlreadyExists` -> 400
//! - `NotFound` -> 404
//! - `Token` / `AuthMismatch` -> 401
//! - `Timeout` -> 504
//! - `Database` / `InternalError` -> 500 (details logged, never leaked)
//!
//! All failure bodies are JSON of the form `{"error": message}`.

use crate::errors::ServiceError;
use axum::{http::StatusCode, response::Json};
use serde::Serialize;

/// Standard error body for failed requests.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Converts ServiceError to the canonical HTTP status and JSON body.
pub fn service_error_to_http(error: ServiceError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, message) = match error {
        ServiceError::Validation { message } => (StatusCode::BAD_REQUEST, message),
        ServiceError::AlreadyExists { entity, identifier } => (
            StatusCode::BAD_REQUEST,
            format!("{entity} '{identifier}' already exists"),
        ),
        ServiceError::NotFound { entity, identifier } => (
            StatusCode::NOT_FOUND,
            format!("{entity} '{identifier}' not found"),
        ),
        ServiceError::Token { kind } => {
            (StatusCode::UNAUTHORIZED, format!("Invalid token: {kind}"))
        }
        ServiceError::AuthMismatch { message } => (StatusCode::UNAUTHORIZED, message),
        ServiceError::Timeout { what } => {
            tracing::error!("Collaborator call timed out: {what}");
            (
                StatusCode::GATEWAY_TIMEOUT,
                "Request timed out".to_string(),
            )
        }
        ServiceError::Database { source } => {
            tracing::error!("Database error: {source}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
        ServiceError::InternalError { message } => {
            tracing::error!("Internal error: {message}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    };

    (status, Json(ErrorResponse { error: message }))
}
