// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity session holder.
//!
//! The holder is the only writer of session state. Everything else receives a
//! [`SessionContext`], a read-only view that observes changes.

use std::sync::Arc;
use tokio::sync::watch;

use crate::error::{AppError, Result};
use crate::models::User;
use crate::services::identity::{IdentityProvider, Session, SignUpResult};
use crate::validation;

/// Session lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing has been checked yet.
    Uninitialized,
    /// A provider call is in flight.
    Loading,
    /// Checked: nobody is signed in.
    Absent,
    Present(Session),
}

impl SessionState {
    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::Present(session) => Some(&session.user),
            _ => None,
        }
    }
}

/// Read-only view of the current session.
#[derive(Clone)]
pub struct SessionContext {
    rx: watch::Receiver<SessionState>,
}

impl SessionContext {
    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.rx.borrow().clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.rx.borrow().user().cloned()
    }

    /// Wait until the state changes. Returns `false` once the holder is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// Owns the session and wraps the identity provider.
pub struct SessionHolder {
    provider: Arc<dyn IdentityProvider>,
    tx: watch::Sender<SessionState>,
}

impl SessionHolder {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (tx, _rx) = watch::channel(SessionState::Uninitialized);
        Self { provider, tx }
    }

    /// Holder seeded with an already-authenticated user (e.g. from a verified
    /// session cookie), without a provider round trip.
    pub fn restored(provider: Arc<dyn IdentityProvider>, user: User) -> Self {
        let holder = Self::new(provider);
        holder.set(SessionState::Present(Session {
            user,
            access_token: None,
        }));
        holder
    }

    pub fn state(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.tx.borrow().user().cloned()
    }

    pub fn subscribe(&self) -> SessionContext {
        SessionContext {
            rx: self.tx.subscribe(),
        }
    }

    fn set(&self, state: SessionState) {
        self.tx.send_replace(state);
    }

    /// Resolve the session from a stored provider token.
    ///
    /// No token or a rejected token leaves the session absent.
    pub async fn restore(&self, access_token: Option<&str>) -> Result<SessionState> {
        let Some(token) = access_token else {
            self.set(SessionState::Absent);
            return Ok(self.state());
        };

        self.set(SessionState::Loading);
        match self.provider.get_user(token).await {
            Ok(user) => {
                self.set(SessionState::Present(Session {
                    user,
                    access_token: Some(token.to_string()),
                }));
            }
            Err(err) => {
                tracing::warn!(error = %err, "Stored session rejected by provider");
                self.set(SessionState::Absent);
            }
        }
        Ok(self.state())
    }

    /// Sign in with email and password.
    ///
    /// A session that is already present stays present while the provider
    /// call is in flight, so scans in that window are still attributed.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User> {
        let email = validation::validate_sign_in(email, password)?;

        let previous = self.state();
        if !matches!(previous, SessionState::Present(_)) {
            self.set(SessionState::Loading);
        }
        match self.provider.sign_in(&email, password).await {
            Ok(session) => {
                let user = session.user.clone();
                tracing::info!(user_id = %user.id, "Signed in");
                self.set(SessionState::Present(session));
                Ok(user)
            }
            Err(err) => {
                self.set(Self::settle(previous));
                Err(AppError::Identity(err))
            }
        }
    }

    /// Re-check the signed-in user's password and swap in the fresh provider
    /// session. The current session is never withdrawn in the meantime.
    pub async fn reauthenticate(&self, password: &str) -> Result<()> {
        let SessionState::Present(current) = self.state() else {
            return Err(AppError::Unauthorized);
        };
        validation::validate_sign_in(&current.user.email, password)?;

        let session = self
            .provider
            .sign_in(&current.user.email, password)
            .await
            .map_err(AppError::Identity)?;
        if session.user.id != current.user.id {
            tracing::warn!(user_id = %current.user.id, "Re-authentication resolved a different user");
            return Err(AppError::Unauthorized);
        }

        self.set(SessionState::Present(session));
        Ok(())
    }

    /// Register a new account. The session becomes present only when the
    /// provider signs the new user in immediately.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<SignUpResult> {
        let email = validation::validate_sign_up(email, password, confirm_password)?;

        let previous = self.state();
        self.set(SessionState::Loading);
        match self.provider.sign_up(&email, password).await {
            Ok(result) => {
                tracing::info!(user_id = %result.user.id, "Account registered");
                match &result.session {
                    Some(session) => self.set(SessionState::Present(session.clone())),
                    None => self.set(Self::settle(previous)),
                }
                Ok(result)
            }
            Err(err) => {
                self.set(Self::settle(previous));
                Err(AppError::Identity(err))
            }
        }
    }

    /// Sign out. The local session is cleared even if the provider call fails.
    pub async fn sign_out(&self) -> Result<()> {
        let SessionState::Present(session) = self.state() else {
            self.set(SessionState::Absent);
            return Ok(());
        };

        self.set(SessionState::Absent);

        if session.access_token.is_none() {
            return Ok(());
        }

        if let Err(err) = self.provider.sign_out(&session).await {
            tracing::warn!(
                user_id = %session.user.id,
                error = %err,
                "Provider sign-out failed; local session cleared anyway"
            );
        }
        Ok(())
    }

    /// Change the signed-in user's password.
    pub async fn change_password(&self, new_password: &str, confirm_password: &str) -> Result<()> {
        validation::validate_new_password(new_password, confirm_password)?;

        let SessionState::Present(session) = self.state() else {
            return Err(AppError::Unauthorized);
        };

        self.provider
            .update_password(&session, new_password)
            .await
            .map_err(AppError::Identity)?;

        tracing::info!(user_id = %session.user.id, "Password changed");
        Ok(())
    }

    fn settle(previous: SessionState) -> SessionState {
        match previous {
            SessionState::Present(session) => SessionState::Present(session),
            _ => SessionState::Absent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::identity::{IdentityError, MemoryIdentity};
    use crate::validation::ValidationError;

    fn holder() -> (SessionHolder, Arc<MemoryIdentity>) {
        let provider = Arc::new(MemoryIdentity::new());
        (SessionHolder::new(provider.clone()), provider)
    }

    #[tokio::test]
    async fn lifecycle_uninitialized_to_present_to_absent() {
        let (holder, _) = holder();
        assert_eq!(holder.state(), SessionState::Uninitialized);

        holder.restore(None).await.unwrap();
        assert_eq!(holder.state(), SessionState::Absent);

        holder
            .sign_up("juan@example.com", "secret1", "secret1")
            .await
            .unwrap();
        assert!(holder.current_user().is_some());

        holder.sign_out().await.unwrap();
        assert_eq!(holder.state(), SessionState::Absent);
    }

    #[tokio::test]
    async fn validation_runs_before_provider() {
        let (holder, provider) = holder();
        provider.set_offline(true);

        // Offline provider would yield a network error; validation wins first.
        let err = holder
            .sign_up("juan@example.com", "secret1", "secret2")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(
            err.to_string(),
            format!("Invalid request: {}", ValidationError::PasswordMismatch)
        );
    }

    #[tokio::test]
    async fn failed_sign_in_leaves_session_absent() {
        let (holder, _) = holder();
        let err = holder
            .sign_in("nobody@example.com", "secret1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Identity(IdentityError::InvalidCredentials)
        ));
        assert_eq!(holder.state(), SessionState::Absent);
    }

    #[tokio::test]
    async fn context_observes_changes() {
        let (holder, _) = holder();
        let mut ctx = holder.subscribe();
        assert!(ctx.current_user().is_none());

        holder
            .sign_up("juan@example.com", "secret1", "secret1")
            .await
            .unwrap();
        assert!(ctx.changed().await);
        assert_eq!(
            ctx.current_user().map(|u| u.email),
            Some("juan@example.com".to_string())
        );
    }

    #[tokio::test]
    async fn restore_with_token() {
        let (holder, provider) = holder();
        let signed_up = provider.sign_up("a@example.com", "secret1").await.unwrap();
        let token = signed_up.session.unwrap().access_token.unwrap();

        holder.restore(Some(&token)).await.unwrap();
        assert_eq!(holder.current_user(), Some(signed_up.user));

        let other = SessionHolder::new(provider.clone());
        other.restore(Some("bogus")).await.unwrap();
        assert_eq!(other.state(), SessionState::Absent);
    }

    #[tokio::test]
    async fn change_password_requires_session() {
        let (holder, _) = holder();
        let err = holder
            .change_password("newsecret", "newsecret")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));

        holder
            .sign_up("juan@example.com", "secret1", "secret1")
            .await
            .unwrap();
        holder
            .change_password("newsecret", "newsecret")
            .await
            .unwrap();
        holder.sign_out().await.unwrap();
        holder
            .sign_in("juan@example.com", "newsecret")
            .await
            .unwrap();
    }
}
