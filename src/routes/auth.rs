// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email/password authentication routes.

use axum::{extract::State, http::header, http::HeaderMap, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::Result;
use crate::middleware::auth::{create_jwt, verify_jwt, SESSION_COOKIE};
use crate::models::User;
use crate::session::SessionHolder;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/sign-out", post(sign_out))
}

#[derive(Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SignInResponse {
    pub token: String,
    pub user: User,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SignUpResponse {
    pub user: User,
    /// False when the provider wants the address confirmed first
    pub signed_in: bool,
    pub token: Option<String>,
}

#[derive(Serialize)]
pub struct SignOutResponse {
    pub success: bool,
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Sign in with email and password.
async fn sign_in(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<SignInRequest>,
) -> Result<(CookieJar, Json<SignInResponse>)> {
    let session = SessionHolder::new(state.identity.clone());
    let user = session.sign_in(&req.email, &req.password).await?;

    let token = create_jwt(&user, &state.config.jwt_signing_key)?;
    state.scanners.install(session)?;

    tracing::info!(user_id = %user.id, "User signed in");

    Ok((
        jar.add(session_cookie(token.clone())),
        Json(SignInResponse { token, user }),
    ))
}

/// Register a new account.
async fn sign_up(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<SignUpRequest>,
) -> Result<(CookieJar, Json<SignUpResponse>)> {
    let session = SessionHolder::new(state.identity.clone());
    let result = session
        .sign_up(&req.email, &req.password, &req.confirm_password)
        .await?;

    if result.session.is_none() {
        tracing::info!(user_id = %result.user.id, "Account registered, confirmation pending");
        return Ok((
            jar,
            Json(SignUpResponse {
                user: result.user,
                signed_in: false,
                token: None,
            }),
        ));
    }

    let token = create_jwt(&result.user, &state.config.jwt_signing_key)?;
    state.scanners.install(session)?;

    Ok((
        jar.add(session_cookie(token.clone())),
        Json(SignUpResponse {
            user: result.user,
            signed_in: true,
            token: Some(token),
        }),
    ))
}

/// Sign out: revoke the session token, tear down the scanner slot, end the
/// provider session, clear the cookie.
///
/// Always succeeds; a missing or invalid session just clears the cookie.
async fn sign_out(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<(CookieJar, Json<SignOutResponse>)> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.strip_prefix("Bearer "))
                .map(str::to_string)
        });

    if let Some(user) = token.and_then(|t| verify_jwt(&t, &state.config.jwt_signing_key)) {
        state.revoked_tokens.revoke(&user);
        if let Some(slot) = state.scanners.remove(&user.user_id) {
            slot.session.sign_out().await?;
        }
        tracing::info!(user_id = %user.user_id, "User signed out");
    }

    Ok((
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Json(SignOutResponse { success: true }),
    ))
}
