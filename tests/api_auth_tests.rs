// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API authentication and CORS tests.
//!
//! These tests verify that:
//! 1. Protected routes reject requests without valid tokens
//! 2. Protected routes accept a valid token as Bearer header or cookie
//! 3. Sign-up, sign-in and sign-out manage the session cookie, and a
//!    signed-out token stops working
//! 4. CORS preflight requests return correct headers

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, Response, StatusCode},
};
use scan_tracker::middleware::auth::{create_jwt, SESSION_COOKIE};
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;
use common::{create_test_app, test_user};

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// The `Set-Cookie` header for the session cookie, if any.
fn session_set_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{SESSION_COOKIE}=")))
        .map(str::to_string)
}

#[tokio::test]
async fn test_protected_route_without_token() {
    let (app, _, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/dashboard")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_invalid_token() {
    let (app, _, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/dashboard")
                .header(header::AUTHORIZATION, "Bearer invalid.token.here")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_with_valid_token() {
    let (app, state, _) = create_test_app();
    let token = create_jwt(&test_user(), &state.config.jwt_signing_key).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let me = body_json(response).await;
    assert_eq!(me["id"], "user-1");
    assert_eq!(me["email"], "juan@example.com");
}

#[tokio::test]
async fn test_protected_route_with_cookie() {
    let (app, state, _) = create_test_app();
    let token = create_jwt(&test_user(), &state.config.jwt_signing_key).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/dashboard")
                .header(header::COOKIE, format!("{SESSION_COOKIE}={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let stats = body_json(response).await;
    assert_eq!(stats["total_products"], 1);
    assert_eq!(stats["total_scans"], 0);
}

#[tokio::test]
async fn test_token_signed_with_other_key_rejected() {
    let (app, _, _) = create_test_app();
    let token = create_jwt(&test_user(), b"some_other_key_32_bytes_minimum!").unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cors_preflight() {
    let (app, _, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/api/dashboard")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // OPTIONS should return 200 (CORS preflight success)
    assert_eq!(response.status(), StatusCode::OK);

    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
}

#[tokio::test]
async fn test_public_route_no_auth_required() {
    let (app, _, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key("x-content-type-options"));
    let health = body_json(response).await;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["active_scanners"], 0);
}

#[tokio::test]
async fn test_sign_up_sign_in_sign_out_flow() {
    let (app, state, _) = create_test_app();

    // Sign up signs in immediately with the memory provider.
    let response = app
        .clone()
        .oneshot(post_json(
            "/auth/sign-up",
            json!({
                "email": "  ana@example.com ",
                "password": "secret1",
                "confirm_password": "secret1",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_set_cookie(&response).is_some());
    let signed_up = body_json(response).await;
    assert_eq!(signed_up["signed_in"], true);
    assert_eq!(signed_up["user"]["email"], "ana@example.com");
    assert_eq!(state.scanners.len(), 1);

    // Wrong password.
    let response = app
        .clone()
        .oneshot(post_json(
            "/auth/sign-in",
            json!({ "email": "ana@example.com", "password": "wrong-1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "invalid_credentials");

    // Right password.
    let response = app
        .clone()
        .oneshot(post_json(
            "/auth/sign-in",
            json!({ "email": "ana@example.com", "password": "secret1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_set_cookie(&response).expect("session cookie");
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Path=/"));
    let signed_in = body_json(response).await;
    let token = signed_in["token"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/me")
                .header(header::COOKIE, format!("{SESSION_COOKIE}={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["email"], "ana@example.com");

    // Sign out drops the scanner slot and clears the cookie.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/sign-out")
                .header(header::COOKIE, format!("{SESSION_COOKIE}={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cleared = session_set_cookie(&response).expect("removal cookie");
    assert!(cleared.starts_with(&format!("{SESSION_COOKIE}=;")));
    assert_eq!(body_json(response).await["success"], true);
    assert!(state.scanners.is_empty());
}

#[tokio::test]
async fn test_sign_up_password_mismatch() {
    let (app, state, _) = create_test_app();

    let response = app
        .oneshot(post_json(
            "/auth/sign-up",
            json!({
                "email": "ana@example.com",
                "password": "secret1",
                "confirm_password": "secret2",
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(session_set_cookie(&response).is_none());
    assert!(state.scanners.is_empty());
}

#[tokio::test]
async fn test_sign_up_duplicate_email() {
    let (app, _, _) = create_test_app();
    let body = json!({
        "email": "ana@example.com",
        "password": "secret1",
        "confirm_password": "secret1",
    });

    let first = app
        .clone()
        .oneshot(post_json("/auth/sign-up", body.clone()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(post_json("/auth/sign-up", body))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_sign_in_blank_fields() {
    let (app, _, _) = create_test_app();

    let response = app
        .oneshot(post_json(
            "/auth/sign-in",
            json!({ "email": "", "password": "" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sign_out_without_session_succeeds() {
    let (app, _, _) = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/sign-out")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_signed_out_token_is_rejected() {
    let (app, state, db) = create_test_app();

    let response = app
        .clone()
        .oneshot(post_json(
            "/auth/sign-up",
            json!({
                "email": "ana@example.com",
                "password": "secret1",
                "confirm_password": "secret1",
            }),
        ))
        .await
        .unwrap();
    let token = body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string();

    let scan = |token: &str| {
        Request::builder()
            .method("POST")
            .uri("/api/scanner/manual")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from(json!({ "serial_number": "SN12345" }).to_string()))
            .unwrap()
    };

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/sign-out")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(state.scanners.is_empty());

    // The old token no longer authenticates, so nothing reaches the ledger.
    let response = app.clone().oneshot(scan(&token)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(db.scans().is_empty());
    assert!(state.scanners.is_empty());

    // A fresh sign-in issues a token that works.
    let response = app
        .clone()
        .oneshot(post_json(
            "/auth/sign-in",
            json!({ "email": "ana@example.com", "password": "secret1" }),
        ))
        .await
        .unwrap();
    let fresh = body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string();
    assert_ne!(fresh, token);

    let response = app.clone().oneshot(scan(&fresh)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(db.scans().len(), 1);
}

#[tokio::test]
async fn test_change_password() {
    let (app, _, _) = create_test_app();

    let response = app
        .clone()
        .oneshot(post_json(
            "/auth/sign-up",
            json!({
                "email": "ana@example.com",
                "password": "secret1",
                "confirm_password": "secret1",
            }),
        ))
        .await
        .unwrap();
    let token = body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string();

    let change = |current: &str| {
        Request::builder()
            .method("PUT")
            .uri("/api/profile/password")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from(
                json!({
                    "current_password": current,
                    "new_password": "secret2",
                    "confirm_password": "secret2",
                })
                .to_string(),
            ))
            .unwrap()
    };

    let response = app.clone().oneshot(change("nope-nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.clone().oneshot(change("secret1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post_json(
            "/auth/sign-in",
            json!({ "email": "ana@example.com", "password": "secret2" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
