// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication middleware.

use crate::models::User;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use dashmap::DashMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "scan_token";

/// Session lifetime in seconds (30 days).
pub const SESSION_TTL_SECS: usize = 30 * 24 * 60 * 60;

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (identity provider user ID)
    pub sub: String,
    pub email: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// Unique token ID, used to revoke the token on sign-out
    pub jti: String,
}

/// Authenticated user extracted from JWT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
    /// ID of the session token that authenticated this request
    pub token_id: String,
    /// Expiration of that token (Unix timestamp)
    pub expires_at: usize,
}

impl AuthUser {
    pub fn user(&self) -> User {
        User {
            id: self.user_id.clone(),
            email: self.email.clone(),
        }
    }
}

/// Verify a session token and return its user.
pub fn verify_jwt(token: &str, signing_key: &[u8]) -> Option<AuthUser> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);

    let claims = decode::<Claims>(token, &key, &validation).ok()?.claims;
    if claims.sub.is_empty() {
        return None;
    }
    Some(AuthUser {
        user_id: claims.sub,
        email: claims.email,
        token_id: claims.jti,
        expires_at: claims.exp,
    })
}

fn unix_now() -> usize {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or(0)
}

/// Session tokens ended by sign-out.
///
/// Entries are kept until the token would have expired anyway.
#[derive(Default)]
pub struct RevokedTokens {
    tokens: DashMap<String, usize>,
}

impl RevokedTokens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revoke(&self, user: &AuthUser) {
        let now = unix_now();
        self.tokens.retain(|_, expires_at| *expires_at > now);
        self.tokens.insert(user.token_id.clone(), user.expires_at);
    }

    pub fn is_revoked(&self, token_id: &str) -> bool {
        self.tokens.contains_key(token_id)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Middleware that requires valid JWT authentication.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // Try cookie first, then header
    let token = if let Some(cookie) = jar.get(SESSION_COOKIE) {
        cookie.value().to_string()
    } else {
        let auth_header = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
            Some(token) => token.to_string(),
            None => return Err(StatusCode::UNAUTHORIZED),
        }
    };

    let auth_user =
        verify_jwt(&token, &state.config.jwt_signing_key).ok_or(StatusCode::UNAUTHORIZED)?;
    if state.revoked_tokens.is_revoked(&auth_user.token_id) {
        tracing::debug!(user_id = %auth_user.user_id, "Rejected signed-out session token");
        return Err(StatusCode::UNAUTHORIZED);
    }

    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Create a JWT for a user session.
pub fn create_jwt(user: &User, signing_key: &[u8]) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: user.id.clone(),
        email: user.email.clone(),
        iat: now,
        exp: now + SESSION_TTL_SECS,
        jti: uuid::Uuid::new_v4().to_string(),
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"test_jwt_key_32_bytes_minimum!!";

    #[test]
    fn jwt_round_trips_user() {
        let user = User {
            id: "user-1".to_string(),
            email: "juan@example.com".to_string(),
        };
        let token = create_jwt(&user, KEY).unwrap();

        let auth = verify_jwt(&token, KEY).unwrap();
        assert_eq!(auth.user(), user);
    }

    #[test]
    fn jwt_rejects_wrong_key() {
        let user = User {
            id: "user-1".to_string(),
            email: "juan@example.com".to_string(),
        };
        let token = create_jwt(&user, KEY).unwrap();
        assert!(verify_jwt(&token, b"another_key_entirely_32_bytes!!").is_none());
        assert!(verify_jwt("not-a-jwt", KEY).is_none());
    }

    #[test]
    fn each_jwt_gets_its_own_token_id() {
        let user = User {
            id: "user-1".to_string(),
            email: "juan@example.com".to_string(),
        };
        let first = verify_jwt(&create_jwt(&user, KEY).unwrap(), KEY).unwrap();
        let second = verify_jwt(&create_jwt(&user, KEY).unwrap(), KEY).unwrap();
        assert_ne!(first.token_id, second.token_id);

        let revoked = RevokedTokens::new();
        revoked.revoke(&first);
        assert!(revoked.is_revoked(&first.token_id));
        assert!(!revoked.is_revoked(&second.token_id));
    }

    #[test]
    fn revoking_prunes_expired_entries() {
        let revoked = RevokedTokens::new();
        let stale = AuthUser {
            user_id: "user-1".to_string(),
            email: "juan@example.com".to_string(),
            token_id: "stale".to_string(),
            expires_at: 1,
        };
        revoked.revoke(&stale);
        assert_eq!(revoked.len(), 1);

        let current = AuthUser {
            token_id: "current".to_string(),
            expires_at: unix_now() + SESSION_TTL_SECS,
            ..stale
        };
        revoked.revoke(&current);
        assert_eq!(revoked.len(), 1);
        assert!(revoked.is_revoked("current"));
    }
}
