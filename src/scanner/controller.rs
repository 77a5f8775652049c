// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scan capture controller.
//!
//! Turns decoded strings (relayed camera decodes or manual entry) into product
//! lookups, drives the `Idle → Detecting → Success | Error → Idle` cycle, and
//! logs each successful lookup through the [`LedgerWriter`].
//!
//! Every resolution attempt takes a fresh request token. A response whose
//! token is no longer current changes nothing and writes nothing; it is
//! reported as [`ScanOutcome::Superseded`]. Stopping the camera advances the
//! token too, so lookups in flight at stop time are discarded.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::AppError;
use crate::models::{Product, ScanMethod};
use crate::scanner::capture::{CaptureConfig, CaptureError, CaptureEvent, CaptureSurface};
use crate::services::directory::ProductDirectory;
use crate::services::ledger::{LedgerPolicy, LedgerWriter};
use crate::session::SessionContext;
use crate::validation::{self, ValidationError};

pub const NOT_FOUND_MESSAGE: &str = "Product not found in directory";
pub const LOOKUP_FAILED_MESSAGE: &str = "Error searching product";

/// Controller timing knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanTimings {
    /// Debounce window after the first decode
    pub settle: Duration,
    /// How long `Success`/`Error` stay visible before returning to `Idle`
    pub hold: Duration,
    /// Upper bound on a directory lookup or ledger append
    pub lookup_timeout: Duration,
}

impl Default for ScanTimings {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(300),
            hold: Duration::from_millis(2000),
            lookup_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    #[default]
    Idle,
    Detecting,
    Success,
    Error,
}

/// Result of one resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "detail", rename_all = "snake_case")]
pub enum ScanOutcome {
    Found(Product),
    NotFound,
    /// Store error or timeout; the string is for logs, not for users.
    Fault(String),
    /// A newer attempt or a stop overtook this one.
    Superseded,
}

/// What the scanner page renders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanSnapshot {
    pub status: ScanStatus,
    pub camera_active: bool,
    /// Last product found (cleared on a miss)
    pub product: Option<Product>,
    /// User-facing error text
    pub message: Option<String>,
    pub last_method: Option<ScanMethod>,
}

#[derive(Default)]
struct ControlState {
    snapshot: ScanSnapshot,
    starting: bool,
    /// Bumped on every stop so a start racing a stop can tell.
    camera_epoch: u64,
    /// Latest decode inside the open settle window
    candidate: Option<String>,
    settle_task: Option<JoinHandle<()>>,
    /// Settle task that has moved on to resolving its candidate
    lookup_task: Option<JoinHandle<()>>,
    pump_task: Option<JoinHandle<()>>,
    hold_task: Option<JoinHandle<()>>,
    hold_epoch: u64,
}

impl ControlState {
    fn abort_tasks(&mut self) {
        for task in [
            self.settle_task.take(),
            self.lookup_task.take(),
            self.pump_task.take(),
            self.hold_task.take(),
        ]
        .into_iter()
        .flatten()
        {
            task.abort();
        }
        self.candidate = None;
        self.hold_epoch += 1;
    }
}

struct Inner {
    directory: Arc<dyn ProductDirectory>,
    writer: LedgerWriter,
    surface: Arc<dyn CaptureSurface>,
    session: SessionContext,
    config: CaptureConfig,
    timings: ScanTimings,
    token: AtomicU64,
    state: Mutex<ControlState>,
    snapshot_tx: watch::Sender<ScanSnapshot>,
}

/// Owns one capture surface and its scan cycle.
///
/// Dropping the controller stops the camera and cancels all pending work.
pub struct ScanController {
    inner: Arc<Inner>,
}

impl ScanController {
    pub fn new(
        directory: Arc<dyn ProductDirectory>,
        writer: LedgerWriter,
        surface: Arc<dyn CaptureSurface>,
        session: SessionContext,
        timings: ScanTimings,
    ) -> Self {
        let (snapshot_tx, _rx) = watch::channel(ScanSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                directory,
                writer,
                surface,
                session,
                config: CaptureConfig::default(),
                timings,
                token: AtomicU64::new(0),
                state: Mutex::new(ControlState::default()),
                snapshot_tx,
            }),
        }
    }

    pub fn snapshot(&self) -> ScanSnapshot {
        self.inner.snapshot_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ScanSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    pub fn status(&self) -> ScanStatus {
        self.inner.snapshot_tx.borrow().status
    }

    pub fn is_camera_active(&self) -> bool {
        self.inner.snapshot_tx.borrow().camera_active
    }

    pub fn capture_config(&self) -> &CaptureConfig {
        &self.inner.config
    }

    /// Ask the surface to start capturing.
    ///
    /// Does not enter `Detecting`; that waits for the first decode. Starting
    /// an active camera is a no-op.
    pub async fn start_camera(&self) -> Result<(), CaptureError> {
        let epoch = {
            let mut st = self.inner.lock();
            if st.snapshot.camera_active || st.starting {
                return Ok(());
            }
            st.starting = true;
            st.camera_epoch
        };

        let started = self.inner.surface.start(&self.inner.config).await;

        let mut st = self.inner.lock();
        if st.camera_epoch != epoch {
            // Stopped while the surface was starting.
            drop(st);
            if started.is_ok() {
                self.inner.surface.stop();
            }
            return Err(CaptureError::NotActive);
        }
        st.starting = false;

        match started {
            Ok(events) => {
                st.snapshot.camera_active = true;
                st.snapshot.status = ScanStatus::Idle;
                st.snapshot.message = None;
                let weak = Arc::downgrade(&self.inner);
                st.pump_task = Some(tokio::spawn(pump_events(weak, events)));
                self.inner.publish(&st);
                tracing::info!(surface = %self.inner.config.surface_id, "Camera started");
                Ok(())
            }
            Err(err) => {
                st.snapshot.camera_active = false;
                st.snapshot.message = Some(err.to_string());
                self.inner.publish(&st);
                tracing::warn!(error = %err, "Camera failed to start");
                Err(err)
            }
        }
    }

    /// Release the camera and cancel everything pending.
    ///
    /// Stopping a stopped controller is a no-op.
    pub fn stop_camera(&self) {
        let active = {
            let st = self.inner.lock();
            st.snapshot.camera_active || st.starting
        };
        if active {
            self.inner.teardown();
            tracing::info!("Camera stopped");
        }
    }

    /// Resolve a typed serial number, bypassing the settle window.
    ///
    /// Blank input is rejected before any lookup.
    pub async fn submit_manual(&self, text: &str) -> Result<ScanOutcome, ValidationError> {
        let serial_number = validation::normalize_serial(text)?;
        Ok(self
            .inner
            .resolve(serial_number, ScanMethod::Manual)
            .await)
    }
}

impl Drop for ScanController {
    fn drop(&mut self) {
        self.inner.teardown();
    }
}

async fn pump_events(inner: Weak<Inner>, mut events: mpsc::Receiver<CaptureEvent>) {
    while let Some(event) = events.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        match event {
            CaptureEvent::Decoded(text) => inner.on_decoded(&text),
            CaptureEvent::Fault(message) => {
                tracing::debug!(message = %message, "Capture frame not decoded");
            }
        }
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, st: &ControlState) {
        self.snapshot_tx.send_replace(st.snapshot.clone());
    }

    fn is_current(&self, token: u64) -> bool {
        self.token.load(Ordering::SeqCst) == token
    }

    /// Cancel every task, advance the token, release the surface and force `Idle`.
    fn teardown(&self) {
        let release = {
            let mut st = self.lock();
            self.token.fetch_add(1, Ordering::SeqCst);
            st.abort_tasks();
            st.camera_epoch += 1;
            let release = st.snapshot.camera_active || st.starting;
            st.starting = false;
            st.snapshot.camera_active = false;
            st.snapshot.status = ScanStatus::Idle;
            self.publish(&st);
            release
        };
        if release {
            self.surface.stop();
        }
    }

    fn on_decoded(self: &Arc<Self>, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        let mut st = self.lock();
        if !st.snapshot.camera_active {
            return;
        }

        st.candidate = Some(text.to_string());
        if st.settle_task.is_some() {
            return;
        }

        if let Some(hold) = st.hold_task.take() {
            hold.abort();
        }
        st.hold_epoch += 1;
        st.snapshot.status = ScanStatus::Detecting;
        self.publish(&st);

        let weak = Arc::downgrade(self);
        let settle = self.timings.settle;
        st.settle_task = Some(tokio::spawn(async move {
            tokio::time::sleep(settle).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let candidate = {
                let mut st = inner.lock();
                st.lookup_task = st.settle_task.take();
                st.candidate.take()
            };
            if let Some(serial_number) = candidate {
                inner.resolve(serial_number, ScanMethod::Camera).await;
            }
        }));
    }

    async fn resolve(self: &Arc<Self>, serial_number: String, method: ScanMethod) -> ScanOutcome {
        let token = self.token.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(serial_number = %serial_number, %method, token, "Resolving serial number");

        let lookup = tokio::time::timeout(
            self.timings.lookup_timeout,
            self.directory.find_by_serial(&serial_number),
        )
        .await
        .unwrap_or_else(|_| {
            Err(AppError::Timeout(format!(
                "lookup exceeded {} ms",
                self.timings.lookup_timeout.as_millis()
            )))
        });

        if !self.is_current(token) {
            tracing::debug!(serial_number = %serial_number, token, "Discarding superseded lookup");
            return ScanOutcome::Superseded;
        }

        match lookup {
            Ok(Some(product)) => self.found(token, serial_number, method, product).await,
            Ok(None) => {
                tracing::info!(serial_number = %serial_number, %method, "Serial number not in directory");
                self.settle_outcome(token, method, ScanStatus::Error, None, Some(NOT_FOUND_MESSAGE));
                ScanOutcome::NotFound
            }
            Err(err) => {
                tracing::error!(serial_number = %serial_number, %method, error = %err, "Product lookup failed");
                self.settle_outcome(
                    token,
                    method,
                    ScanStatus::Error,
                    None,
                    Some(LOOKUP_FAILED_MESSAGE),
                );
                ScanOutcome::Fault(err.to_string())
            }
        }
    }

    async fn found(
        self: &Arc<Self>,
        token: u64,
        serial_number: String,
        method: ScanMethod,
        product: Product,
    ) -> ScanOutcome {
        let user = self.session.current_user();

        match self.writer.policy() {
            LedgerPolicy::BestEffort => {
                if !self.settle_outcome(
                    token,
                    method,
                    ScanStatus::Success,
                    Some(product.clone()),
                    None,
                ) {
                    return ScanOutcome::Superseded;
                }
                if let Err(err) = self.writer.record(user.as_ref(), &serial_number, method).await {
                    tracing::warn!(serial_number = %serial_number, error = %err, "Scan not logged");
                }
                ScanOutcome::Found(product)
            }
            LedgerPolicy::Acknowledged => {
                match self.writer.record(user.as_ref(), &serial_number, method).await {
                    Ok(_) => {
                        if !self.settle_outcome(
                            token,
                            method,
                            ScanStatus::Success,
                            Some(product.clone()),
                            None,
                        ) {
                            return ScanOutcome::Superseded;
                        }
                        ScanOutcome::Found(product)
                    }
                    Err(err) => {
                        tracing::error!(
                            serial_number = %serial_number,
                            error = %err,
                            "Scan not logged, reporting failure"
                        );
                        self.settle_outcome(
                            token,
                            method,
                            ScanStatus::Error,
                            None,
                            Some(LOOKUP_FAILED_MESSAGE),
                        );
                        ScanOutcome::Fault(err.to_string())
                    }
                }
            }
        }
    }

    /// Publish a terminal status and schedule the return to `Idle`.
    ///
    /// Returns `false` (and changes nothing) if `token` is stale.
    fn settle_outcome(
        self: &Arc<Self>,
        token: u64,
        method: ScanMethod,
        status: ScanStatus,
        product: Option<Product>,
        message: Option<&str>,
    ) -> bool {
        let mut st = self.lock();
        if !self.is_current(token) {
            return false;
        }

        st.snapshot.status = status;
        st.snapshot.last_method = Some(method);
        st.snapshot.message = message.map(str::to_string);
        st.snapshot.product = product;
        self.publish(&st);

        if let Some(hold) = st.hold_task.take() {
            hold.abort();
        }
        st.hold_epoch += 1;
        let epoch = st.hold_epoch;
        let weak = Arc::downgrade(self);
        let hold = self.timings.hold;
        st.hold_task = Some(tokio::spawn(async move {
            tokio::time::sleep(hold).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut st = inner.lock();
            if st.hold_epoch != epoch {
                return;
            }
            st.hold_task = None;
            if matches!(st.snapshot.status, ScanStatus::Success | ScanStatus::Error) {
                st.snapshot.status = ScanStatus::Idle;
                inner.publish(&st);
            }
        }));
        true
    }
}
