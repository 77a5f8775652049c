// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scanner page routes.
//!
//! The camera widget runs in the browser and relays its callbacks here; the
//! per-user controller does the lookups and owns the scan state.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::scanner::{CaptureConfig, CaptureError, ScanOutcome, ScanSnapshot, ScannerSlot};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/scanner", get(get_scanner))
        .route("/api/scanner/start", post(start_camera))
        .route("/api/scanner/stop", post(stop_camera))
        .route("/api/scanner/decode", post(relay_decode))
        .route("/api/scanner/fault", post(relay_fault))
        .route("/api/scanner/manual", post(submit_manual))
}

fn user_slot(state: &AppState, user: &AuthUser) -> Arc<ScannerSlot> {
    state.scanners.slot_for(&user.user())
}

#[derive(Serialize)]
struct ScannerResponse {
    snapshot: ScanSnapshot,
    /// Widget parameters for the browser
    capture: CaptureConfig,
}

async fn get_scanner(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Json<ScannerResponse> {
    let slot = user_slot(&state, &user);
    Json(ScannerResponse {
        snapshot: slot.controller.snapshot(),
        capture: slot.controller.capture_config().clone(),
    })
}

#[derive(Deserialize)]
struct StartRequest {
    /// Set when the browser failed to open the camera (e.g. "NotAllowedError")
    #[serde(default)]
    camera_error: Option<String>,
}

async fn start_camera(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<StartRequest>,
) -> Result<Json<ScannerResponse>> {
    let slot = user_slot(&state, &user);

    if let Some(message) = req.camera_error {
        slot.relay.fail_next_start(CaptureError::from_browser(&message));
    }
    slot.controller.start_camera().await?;

    Ok(Json(ScannerResponse {
        snapshot: slot.controller.snapshot(),
        capture: slot.controller.capture_config().clone(),
    }))
}

async fn stop_camera(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Json<ScanSnapshot> {
    let slot = user_slot(&state, &user);
    slot.controller.stop_camera();
    Json(slot.controller.snapshot())
}

#[derive(Deserialize)]
struct DecodeRequest {
    text: String,
}

/// Relay a decode callback. Resolution happens after the settle window, so
/// the caller polls `/api/scanner` for the result.
async fn relay_decode(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<DecodeRequest>,
) -> Result<(StatusCode, Json<ScanSnapshot>)> {
    let slot = user_slot(&state, &user);
    slot.relay.relay_decode(req.text)?;
    Ok((StatusCode::ACCEPTED, Json(slot.controller.snapshot())))
}

#[derive(Deserialize)]
struct FaultRequest {
    message: String,
}

async fn relay_fault(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<FaultRequest>,
) -> Result<StatusCode> {
    let slot = user_slot(&state, &user);
    slot.relay.relay_fault(req.message)?;
    Ok(StatusCode::ACCEPTED)
}

#[derive(Deserialize)]
struct ManualRequest {
    serial_number: String,
}

#[derive(Serialize)]
struct ManualResponse {
    outcome: ScanOutcome,
    snapshot: ScanSnapshot,
}

async fn submit_manual(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<ManualRequest>,
) -> Result<Json<ManualResponse>> {
    let slot = user_slot(&state, &user);
    let outcome = slot.controller.submit_manual(&req.serial_number).await?;
    Ok(Json(ManualResponse {
        outcome,
        snapshot: slot.controller.snapshot(),
    }))
}
