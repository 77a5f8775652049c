// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::scanner::CaptureError;
use crate::services::identity::IdentityError;
use crate::validation::ValidationError;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Identity provider error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Identity(err) => match err {
                IdentityError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    "invalid_credentials",
                    Some(err.to_string()),
                ),
                IdentityError::AlreadyRegistered => (
                    StatusCode::CONFLICT,
                    "already_registered",
                    Some(err.to_string()),
                ),
                IdentityError::Network(msg) | IdentityError::Provider(msg) => {
                    tracing::error!(error = %msg, "Identity provider failure");
                    (StatusCode::BAD_GATEWAY, "identity_error", None)
                }
            },
            AppError::Capture(err) => match err {
                CaptureError::PermissionDenied(_) => (
                    StatusCode::FORBIDDEN,
                    "camera_permission_denied",
                    Some(err.to_string()),
                ),
                CaptureError::Unavailable(_) | CaptureError::NotActive => (
                    StatusCode::CONFLICT,
                    "camera_unavailable",
                    Some(err.to_string()),
                ),
            },
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Timeout(msg) => {
                tracing::warn!(error = %msg, "Upstream call timed out");
                (StatusCode::GATEWAY_TIMEOUT, "timeout", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
