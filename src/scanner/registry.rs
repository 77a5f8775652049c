// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-user scanner slots.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{AppError, Result};
use crate::models::User;
use crate::scanner::capture::RelayCapture;
use crate::scanner::controller::{ScanController, ScanStatus, ScanTimings};
use crate::services::directory::ProductDirectory;
use crate::services::identity::IdentityProvider;
use crate::services::ledger::LedgerWriter;
use crate::session::SessionHolder;

/// Slots untouched for this long are dropped once their scanner is idle.
pub const SLOT_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

/// Everything one signed-in user's scanner page needs.
pub struct ScannerSlot {
    pub controller: ScanController,
    pub relay: Arc<RelayCapture>,
    pub session: SessionHolder,
    /// Milliseconds since the registry epoch at last use.
    last_seen_ms: AtomicU64,
}

impl ScannerSlot {
    fn touch(&self, now_ms: u64) {
        self.last_seen_ms.store(now_ms, Ordering::Relaxed);
    }

    /// Unused for longer than `ttl`, with no camera open and nothing in flight.
    fn is_idle(&self, now_ms: u64, ttl: Duration) -> bool {
        let unused_ms = now_ms.saturating_sub(self.last_seen_ms.load(Ordering::Relaxed));
        unused_ms > ttl.as_millis() as u64
            && !self.controller.is_camera_active()
            && self.controller.status() == ScanStatus::Idle
    }
}

pub struct ScannerRegistry {
    slots: DashMap<String, Arc<ScannerSlot>>,
    directory: Arc<dyn ProductDirectory>,
    writer: LedgerWriter,
    identity: Arc<dyn IdentityProvider>,
    timings: ScanTimings,
    epoch: Instant,
    idle_ttl: Duration,
}

impl ScannerRegistry {
    pub fn new(
        directory: Arc<dyn ProductDirectory>,
        writer: LedgerWriter,
        identity: Arc<dyn IdentityProvider>,
        timings: ScanTimings,
    ) -> Self {
        Self {
            slots: DashMap::new(),
            directory,
            writer,
            identity,
            timings,
            epoch: Instant::now(),
            idle_ttl: SLOT_IDLE_TTL,
        }
    }

    pub fn with_idle_ttl(mut self, idle_ttl: Duration) -> Self {
        self.idle_ttl = idle_ttl;
        self
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Drop slots nobody has used within the idle TTL.
    ///
    /// The session token stays valid; the next request restores a slot.
    pub fn evict_idle(&self) -> usize {
        let now_ms = self.now_ms();
        let before = self.slots.len();
        self.slots
            .retain(|_, slot| !slot.is_idle(now_ms, self.idle_ttl));
        let evicted = before.saturating_sub(self.slots.len());
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.slots.len(), "Evicted idle scanner slots");
        }
        evicted
    }

    fn build_slot(&self, session: SessionHolder) -> ScannerSlot {
        let relay = Arc::new(RelayCapture::new());
        let controller = ScanController::new(
            self.directory.clone(),
            self.writer.clone(),
            relay.clone(),
            session.subscribe(),
            self.timings,
        );
        ScannerSlot {
            controller,
            relay,
            session,
            last_seen_ms: AtomicU64::new(self.now_ms()),
        }
    }

    /// Install a freshly signed-in session, replacing any previous slot.
    pub fn install(&self, session: SessionHolder) -> Result<Arc<ScannerSlot>> {
        let user = session.current_user().ok_or(AppError::Unauthorized)?;
        self.evict_idle();
        let slot = Arc::new(self.build_slot(session));
        if let Some(previous) = self.slots.insert(user.id.clone(), slot.clone()) {
            previous.controller.stop_camera();
        }
        tracing::debug!(user_id = %user.id, "Scanner slot installed");
        Ok(slot)
    }

    /// Slot for an authenticated user, restoring one from the verified
    /// session token if this process has none (e.g. after a restart).
    pub fn slot_for(&self, user: &User) -> Arc<ScannerSlot> {
        if let Some(slot) = self.slots.get(&user.id) {
            slot.touch(self.now_ms());
            return slot.value().clone();
        }

        self.evict_idle();
        self.slots
            .entry(user.id.clone())
            .or_insert_with(|| {
                tracing::debug!(user_id = %user.id, "Scanner slot restored");
                Arc::new(self.build_slot(SessionHolder::restored(
                    self.identity.clone(),
                    user.clone(),
                )))
            })
            .value()
            .clone()
    }

    /// Remove a user's slot and release its camera.
    pub fn remove(&self, user_id: &str) -> Option<Arc<ScannerSlot>> {
        let (_, slot) = self.slots.remove(user_id)?;
        slot.controller.stop_camera();
        Some(slot)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDb;
    use crate::services::identity::MemoryIdentity;
    use crate::services::ledger::LedgerPolicy;

    const TTL: Duration = Duration::from_secs(60);

    fn registry() -> ScannerRegistry {
        let db = Arc::new(MemoryDb::new());
        let timings = ScanTimings::default();
        let writer = LedgerWriter::new(db.clone(), LedgerPolicy::BestEffort, timings.lookup_timeout);
        ScannerRegistry::new(db, writer, Arc::new(MemoryIdentity::new()), timings)
            .with_idle_ttl(TTL)
    }

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            email: format!("{id}@example.com"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn idle_slots_are_evicted_when_new_ones_arrive() {
        let registry = registry();
        registry.slot_for(&user("a"));
        registry.slot_for(&user("b"));

        tokio::time::advance(TTL / 2).await;
        // Touching keeps "b" alive.
        registry.slot_for(&user("b"));
        tokio::time::advance(TTL / 2 + Duration::from_secs(1)).await;

        registry.slot_for(&user("c"));
        assert_eq!(registry.len(), 2);

        // "a" comes back as a fresh slot.
        registry.slot_for(&user("a"));
        assert_eq!(registry.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn slots_with_an_open_camera_are_kept() {
        let registry = registry();
        let slot = registry.slot_for(&user("a"));
        slot.controller.start_camera().await.unwrap();

        tokio::time::advance(TTL * 2).await;
        assert_eq!(registry.evict_idle(), 0);
        assert_eq!(registry.len(), 1);

        slot.controller.stop_camera();
        assert_eq!(registry.evict_idle(), 1);
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn restored_slot_keeps_the_user_signed_in() {
        let registry = registry();
        let slot = registry.slot_for(&user("a"));
        assert_eq!(slot.session.current_user(), Some(user("a")));
        assert!(Arc::ptr_eq(&slot, &registry.slot_for(&user("a"))));

        assert!(registry.remove("a").is_some());
        assert!(registry.is_empty());
    }
}
