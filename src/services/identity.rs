// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity provider integration.
//!
//! The hosted provider speaks the GoTrue REST dialect:
//! - `POST /auth/v1/token?grant_type=password` (sign in)
//! - `POST /auth/v1/signup`
//! - `POST /auth/v1/logout`
//! - `GET|PUT /auth/v1/user`

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Deserialize;
use std::time::Duration;

use crate::models::User;

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// An authenticated session issued by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: User,
    /// Provider access token; `None` for sessions restored from our own JWT.
    pub access_token: Option<String>,
}

/// Result of a sign-up. Providers that require email confirmation return no session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpResult {
    pub user: User,
    pub session: Option<Session>,
}

/// Identity provider error classification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User already registered")]
    AlreadyRegistered,

    /// The provider could not be reached.
    #[error("Identity provider unreachable: {0}")]
    Network(String),

    /// The provider answered with an unexpected failure.
    #[error("Identity provider failure: {0}")]
    Provider(String),
}

/// External identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, IdentityError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResult, IdentityError>;

    async fn sign_out(&self, session: &Session) -> Result<(), IdentityError>;

    /// Resolve the user behind a provider access token.
    async fn get_user(&self, access_token: &str) -> Result<User, IdentityError>;

    async fn update_password(
        &self,
        session: &Session,
        new_password: &str,
    ) -> Result<(), IdentityError>;
}

// ─── Hosted provider ─────────────────────────────────────────

/// REST client for the hosted identity service.
#[derive(Clone)]
pub struct HostedAuthClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl From<ProviderUser> for User {
    fn from(user: ProviderUser) -> Self {
        User {
            id: user.id,
            email: user.email.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: ProviderUser,
}

/// Sign-up returns either a full session or a bare user (confirmation pending).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(ProviderUser),
}

#[derive(Debug, Default, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
}

impl ProviderErrorBody {
    fn message(&self) -> String {
        self.error_description
            .clone()
            .or_else(|| self.msg.clone())
            .or_else(|| self.error.clone())
            .unwrap_or_default()
    }
}

impl HostedAuthClient {
    pub fn new(base_url: &str, api_key: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn session_token(session: &Session) -> Result<&str, IdentityError> {
        session
            .access_token
            .as_deref()
            .ok_or_else(|| IdentityError::Provider("session has no provider token".to_string()))
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, IdentityError> {
        let response = request
            .header("apikey", &self.api_key)
            .send()
            .await
            .map_err(|e| IdentityError::Network(e.to_string()))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body: ProviderErrorBody = response.json().await.unwrap_or_default();
        Err(classify_error(status.as_u16(), &body))
    }

    async fn json<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, IdentityError> {
        response
            .json()
            .await
            .map_err(|e| IdentityError::Provider(format!("invalid provider response: {e}")))
    }
}

fn classify_error(status: u16, body: &ProviderErrorBody) -> IdentityError {
    let message = body.message();
    let code = body.error_code.as_deref().unwrap_or("");

    if code == "user_already_exists"
        || message.to_ascii_lowercase().contains("already registered")
    {
        return IdentityError::AlreadyRegistered;
    }

    if code == "invalid_credentials" || body.error.as_deref() == Some("invalid_grant") {
        return IdentityError::InvalidCredentials;
    }

    if status == 401 {
        return IdentityError::InvalidCredentials;
    }

    IdentityError::Provider(format!("HTTP {status}: {message}"))
}

#[async_trait]
impl IdentityProvider for HostedAuthClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        let request = self
            .http
            .post(self.url("token"))
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({ "email": email, "password": password }));

        let token: TokenResponse = Self::json(self.send(request).await?).await?;
        tracing::info!(user_id = %token.user.id, "Provider sign-in succeeded");

        Ok(Session {
            user: token.user.into(),
            access_token: Some(token.access_token),
        })
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResult, IdentityError> {
        let request = self
            .http
            .post(self.url("signup"))
            .json(&serde_json::json!({ "email": email, "password": password }));

        let response: SignUpResponse = Self::json(self.send(request).await?).await?;
        Ok(match response {
            SignUpResponse::Session(token) => {
                let user: User = token.user.into();
                SignUpResult {
                    user: user.clone(),
                    session: Some(Session {
                        user,
                        access_token: Some(token.access_token),
                    }),
                }
            }
            SignUpResponse::User(user) => SignUpResult {
                user: user.into(),
                session: None,
            },
        })
    }

    async fn sign_out(&self, session: &Session) -> Result<(), IdentityError> {
        let token = Self::session_token(session)?;
        let request = self.http.post(self.url("logout")).bearer_auth(token);
        self.send(request).await?;
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<User, IdentityError> {
        let request = self.http.get(self.url("user")).bearer_auth(access_token);
        let user: ProviderUser = Self::json(self.send(request).await?).await?;
        Ok(user.into())
    }

    async fn update_password(
        &self,
        session: &Session,
        new_password: &str,
    ) -> Result<(), IdentityError> {
        let token = Self::session_token(session)?;
        let request = self
            .http
            .put(self.url("user"))
            .bearer_auth(token)
            .json(&serde_json::json!({ "password": new_password }));
        self.send(request).await?;
        Ok(())
    }
}

// ─── In-memory provider ──────────────────────────────────────

struct MemoryAccount {
    user: User,
    password: String,
}

/// In-process identity provider for local development and tests.
///
/// Accounts and tokens live only as long as the process.
#[derive(Default)]
pub struct MemoryIdentity {
    accounts: DashMap<String, MemoryAccount>,
    tokens: DashMap<String, String>,
    offline: std::sync::atomic::AtomicBool,
    latency_ms: std::sync::atomic::AtomicU64,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a provider outage: every call fails with a network error.
    pub fn set_offline(&self, offline: bool) {
        self.offline
            .store(offline, std::sync::atomic::Ordering::SeqCst);
    }

    /// Delay every provider call, as a slow network would.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms.store(
            latency.as_millis() as u64,
            std::sync::atomic::Ordering::SeqCst,
        );
    }

    async fn check_online(&self) -> Result<(), IdentityError> {
        let latency = self.latency_ms.load(std::sync::atomic::Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.offline.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(IdentityError::Network("provider offline".to_string()));
        }
        Ok(())
    }

    fn issue_session(&self, user: &User) -> Session {
        let token = uuid::Uuid::new_v4().to_string();
        self.tokens.insert(token.clone(), user.email.clone());
        Session {
            user: user.clone(),
            access_token: Some(token),
        }
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        self.check_online().await?;
        let user = match self.accounts.get(email) {
            Some(account) if account.password == password => account.user.clone(),
            _ => return Err(IdentityError::InvalidCredentials),
        };
        Ok(self.issue_session(&user))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResult, IdentityError> {
        self.check_online().await?;
        let user = match self.accounts.entry(email.to_string()) {
            Entry::Occupied(_) => return Err(IdentityError::AlreadyRegistered),
            Entry::Vacant(slot) => {
                let user = User {
                    id: uuid::Uuid::new_v4().to_string(),
                    email: email.to_string(),
                };
                slot.insert(MemoryAccount {
                    user: user.clone(),
                    password: password.to_string(),
                });
                user
            }
        };
        let session = self.issue_session(&user);
        Ok(SignUpResult {
            user,
            session: Some(session),
        })
    }

    async fn sign_out(&self, session: &Session) -> Result<(), IdentityError> {
        self.check_online().await?;
        if let Some(token) = &session.access_token {
            self.tokens.remove(token);
        }
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<User, IdentityError> {
        self.check_online().await?;
        let email = self
            .tokens
            .get(access_token)
            .map(|e| e.value().clone())
            .ok_or(IdentityError::InvalidCredentials)?;
        self.accounts
            .get(&email)
            .map(|a| a.user.clone())
            .ok_or(IdentityError::InvalidCredentials)
    }

    async fn update_password(
        &self,
        session: &Session,
        new_password: &str,
    ) -> Result<(), IdentityError> {
        self.check_online().await?;
        let mut account = self
            .accounts
            .get_mut(&session.user.email)
            .ok_or(IdentityError::InvalidCredentials)?;
        account.password = new_password.to_string();
        Ok(())
    }
}
