// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Camera/manual scan capture.

pub mod capture;
pub mod controller;
pub mod registry;

pub use capture::{CaptureConfig, CaptureError, CaptureEvent, CaptureSurface, RelayCapture};
pub use controller::{
    ScanController, ScanOutcome, ScanSnapshot, ScanStatus, ScanTimings, LOOKUP_FAILED_MESSAGE,
    NOT_FOUND_MESSAGE,
};
pub use registry::{ScannerRegistry, ScannerSlot};
