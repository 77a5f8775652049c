// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Capture surface: the camera widget that turns frames into decoded strings.
//!
//! The widget itself runs in the browser. [`RelayCapture`] is the server-side
//! end of it: the browser posts decode callbacks, the relay feeds them into
//! the event channel the controller consumes.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;

/// Buffered events between the browser relay and the controller.
const RELAY_CHANNEL_CAPACITY: usize = 32;

/// Parameters handed to the widget when capture starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureConfig {
    /// DOM element the widget renders into
    pub surface_id: String,
    pub fps: u32,
    pub detection_box_width: u32,
    pub detection_box_height: u32,
    pub remember_last_camera: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            surface_id: "qr-scanner-container".to_string(),
            fps: 10,
            detection_box_width: 300,
            detection_box_height: 300,
            remember_last_camera: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// A frame decoded to this text (untrimmed).
    Decoded(String),
    /// A frame failed to decode. Routine while nothing is in view.
    Fault(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("Camera permission denied: {0}")]
    PermissionDenied(String),

    #[error("Camera unavailable: {0}")]
    Unavailable(String),

    #[error("Camera is not active")]
    NotActive,
}

impl CaptureError {
    /// Classify a failure reported by the browser's media APIs.
    pub fn from_browser(message: &str) -> Self {
        let lowered = message.to_ascii_lowercase();
        if lowered.contains("notallowed")
            || lowered.contains("permission")
            || lowered.contains("denied")
        {
            CaptureError::PermissionDenied(message.to_string())
        } else {
            CaptureError::Unavailable(message.to_string())
        }
    }
}

/// A camera-backed decoder.
///
/// `start` yields the event stream for one capture session; `stop` must
/// release the camera synchronously and end that stream.
#[async_trait]
pub trait CaptureSurface: Send + Sync {
    async fn start(
        &self,
        config: &CaptureConfig,
    ) -> Result<mpsc::Receiver<CaptureEvent>, CaptureError>;

    fn stop(&self);

    fn is_active(&self) -> bool;
}

/// Capture surface fed over HTTP by the browser widget.
#[derive(Default)]
pub struct RelayCapture {
    sender: Mutex<Option<mpsc::Sender<CaptureEvent>>>,
    /// Failure to report on the next `start`, set when the browser could not
    /// open the camera.
    pending_failure: Mutex<Option<CaptureError>>,
    config: Mutex<Option<CaptureConfig>>,
    starts: AtomicU64,
    releases: AtomicU64,
}

impl RelayCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `start` fail with `err`.
    pub fn fail_next_start(&self, err: CaptureError) {
        *self
            .pending_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(err);
    }

    /// Forward a decode callback.
    pub fn relay_decode(&self, text: impl Into<String>) -> Result<(), CaptureError> {
        self.relay(CaptureEvent::Decoded(text.into()))
    }

    /// Forward a decode-failure callback.
    pub fn relay_fault(&self, message: impl Into<String>) -> Result<(), CaptureError> {
        self.relay(CaptureEvent::Fault(message.into()))
    }

    fn relay(&self, event: CaptureEvent) -> Result<(), CaptureError> {
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = guard.as_ref() else {
            return Err(CaptureError::NotActive);
        };

        match sender.try_send(event) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(event)) => {
                // Frames arrive continuously; dropping one is harmless.
                tracing::debug!(?event, "Capture relay full, dropping event");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(CaptureError::NotActive),
        }
    }

    /// Config the current capture session was started with.
    pub fn active_config(&self) -> Option<CaptureConfig> {
        self.config
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn start_count(&self) -> u64 {
        self.starts.load(Ordering::SeqCst)
    }

    /// Number of times an active camera was released.
    pub fn release_count(&self) -> u64 {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptureSurface for RelayCapture {
    async fn start(
        &self,
        config: &CaptureConfig,
    ) -> Result<mpsc::Receiver<CaptureEvent>, CaptureError> {
        self.starts.fetch_add(1, Ordering::SeqCst);

        let failure = self
            .pending_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(err) = failure {
            return Err(err);
        }

        let (tx, rx) = mpsc::channel(RELAY_CHANNEL_CAPACITY);
        *self.sender.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);
        *self.config.lock().unwrap_or_else(PoisonError::into_inner) = Some(config.clone());
        Ok(rx)
    }

    fn stop(&self) {
        let released = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.config
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if released.is_some() {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_active(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_widget_setup() {
        let config = CaptureConfig::default();
        assert_eq!(config.surface_id, "qr-scanner-container");
        assert_eq!(config.fps, 10);
        assert_eq!(
            (config.detection_box_width, config.detection_box_height),
            (300, 300)
        );
        assert!(config.remember_last_camera);
    }

    #[test]
    fn browser_errors_are_classified() {
        assert!(matches!(
            CaptureError::from_browser("NotAllowedError: Permission denied"),
            CaptureError::PermissionDenied(_)
        ));
        assert!(matches!(
            CaptureError::from_browser("NotFoundError: Requested device not found"),
            CaptureError::Unavailable(_)
        ));
    }

    #[tokio::test]
    async fn relay_requires_active_session() {
        let relay = RelayCapture::new();
        assert_eq!(relay.relay_decode("SN1"), Err(CaptureError::NotActive));

        let mut rx = relay.start(&CaptureConfig::default()).await.unwrap();
        relay.relay_decode("SN1").unwrap();
        assert_eq!(rx.recv().await, Some(CaptureEvent::Decoded("SN1".into())));

        relay.stop();
        assert!(!relay.is_active());
        assert_eq!(rx.recv().await, None);
        assert_eq!(relay.release_count(), 1);

        // Second stop releases nothing.
        relay.stop();
        assert_eq!(relay.release_count(), 1);
    }

    #[tokio::test]
    async fn pending_failure_is_one_shot() {
        let relay = RelayCapture::new();
        relay.fail_next_start(CaptureError::PermissionDenied("NotAllowedError".into()));

        assert!(relay.start(&CaptureConfig::default()).await.is_err());
        assert!(!relay.is_active());
        assert!(relay.start(&CaptureConfig::default()).await.is_ok());
        assert_eq!(relay.start_count(), 2);
    }
}
