// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::page::nav_items;
use crate::models::{DashboardStats, HistoryMonth, HistoryView, MonthlyReport, NavItem, Page, User};
use crate::time_utils::parse_month;
use crate::validation;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Extension, Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/view/{page}", get(get_view))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/history", get(get_history))
        .route("/api/reports", get(get_report))
        .route("/api/profile/password", put(change_password))
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Resolve an optional `YYYY-MM` parameter, defaulting to the current month.
fn month_param(raw: Option<&str>) -> Result<NaiveDate> {
    match raw.map(str::trim).filter(|m| !m.is_empty()) {
        Some(month) => parse_month(month)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid month: {month}"))),
        None => Ok(today()),
    }
}

// ─── User Profile ────────────────────────────────────────────

/// Get current user.
async fn get_me(Extension(user): Extension<AuthUser>) -> Json<User> {
    Json(user.user())
}

#[derive(Deserialize)]
struct ChangePasswordRequest {
    current_password: String,
    new_password: String,
    confirm_password: String,
}

#[derive(Serialize)]
struct ChangePasswordResponse {
    success: bool,
}

/// Change the password after re-checking the current one.
async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<ChangePasswordResponse>> {
    validation::validate_new_password(&req.new_password, &req.confirm_password)?;

    let slot = state.scanners.slot_for(&user.user());
    slot.session.reauthenticate(&req.current_password).await?;
    slot.session
        .change_password(&req.new_password, &req.confirm_password)
        .await?;

    Ok(Json(ChangePasswordResponse { success: true }))
}

// ─── Navigation ──────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ViewResponse {
    pub page: Page,
    pub title: &'static str,
    pub nav: Vec<NavItem>,
}

/// Resolve the page to mount. Unknown ids fall back to the dashboard.
async fn get_view(Path(page): Path<String>) -> Json<ViewResponse> {
    let page = Page::from_id(&page);
    Json(ViewResponse {
        page,
        title: page.label(),
        nav: nav_items(page),
    })
}

// ─── Dashboard / History / Reports ───────────────────────────

async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<DashboardStats>> {
    let stats = state.aggregation.dashboard(&user.user_id, today()).await?;
    Ok(Json(stats))
}

#[derive(Deserialize)]
struct HistoryQuery {
    /// Month to show (YYYY-MM); defaults to the current month
    month: Option<String>,
    /// Comma-separated dates (YYYY-MM-DD) whose buckets are expanded
    expanded: Option<String>,
}

async fn get_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<HistoryMonth>> {
    let mut view = HistoryView::new(month_param(params.month.as_deref())?);
    for date in params
        .expanded
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
    {
        if !view.is_expanded(date) {
            view.toggle(date);
        }
    }

    let history = state.aggregation.history(&user.user_id, &view).await?;
    Ok(Json(history))
}

#[derive(Deserialize)]
struct ReportQuery {
    month: Option<String>,
}

async fn get_report(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ReportQuery>,
) -> Result<Json<MonthlyReport>> {
    let month = month_param(params.month.as_deref())?;
    let report = state.aggregation.report(&user.user_id, month).await?;
    Ok(Json(report))
}
