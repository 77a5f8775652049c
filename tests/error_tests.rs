// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::to_bytes;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use scan_tracker::error::AppError;
use scan_tracker::scanner::CaptureError;
use scan_tracker::services::IdentityError;
use scan_tracker::validation::ValidationError;
use serde_json::Value;

async fn respond(err: AppError) -> (StatusCode, Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_identity_errors_map_to_status() {
    let (status, body) = respond(IdentityError::InvalidCredentials.into()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_credentials");

    let (status, body) = respond(IdentityError::AlreadyRegistered.into()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already_registered");

    let (status, body) = respond(IdentityError::Network("connection refused".into()).into()).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "identity_error");
    // Provider internals never reach the client.
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_capture_errors_map_to_status() {
    let (status, body) =
        respond(CaptureError::from_browser("NotAllowedError: Permission denied").into()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "camera_permission_denied");

    let (status, body) = respond(CaptureError::NotActive.into()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "camera_unavailable");
}

#[tokio::test]
async fn test_validation_error_is_bad_request() {
    let (status, body) = respond(ValidationError::EmptySerial.into()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
    assert_eq!(body["details"], "Serial number must not be empty");
}

#[tokio::test]
async fn test_store_errors_hide_details() {
    let (status, body) = respond(AppError::Database("grpc: unavailable".into())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "database_error");
    assert!(body.get("details").is_none());

    let (status, body) = respond(AppError::Timeout("lookup exceeded 10000 ms".into())).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["error"], "timeout");
}

#[tokio::test]
async fn test_auth_errors() {
    let (status, body) = respond(AppError::Unauthorized).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = respond(AppError::InvalidToken).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[test]
fn test_capture_error_classification() {
    assert!(matches!(
        CaptureError::from_browser("Permission denied by user"),
        CaptureError::PermissionDenied(_)
    ));
    assert!(matches!(
        CaptureError::from_browser("NotFoundError: Requested device not found"),
        CaptureError::Unavailable(_)
    ));
}
