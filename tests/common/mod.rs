// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use scan_tracker::config::Config;
use scan_tracker::db::{FirestoreDb, MemoryDb};
use scan_tracker::models::{Product, ScanEvent, ScanMethod, User};
use scan_tracker::routes::create_router;
use scan_tracker::scanner::{RelayCapture, ScanController, ScanTimings};
use scan_tracker::services::{LedgerPolicy, LedgerWriter, MemoryIdentity};
use scan_tracker::session::SessionHolder;
use scan_tracker::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// A catalog product with the given serial number and name.
#[allow(dead_code)]
pub fn product(serial: &str, name: &str, code: &str) -> Product {
    Product {
        serial_number: serial.to_string(),
        packaging: "Drum 209L".to_string(),
        production_order: "PO-2025-001".to_string(),
        location: "WH-A".to_string(),
        production_date: "2025-01-15".to_string(),
        production_time: "08:30:00".to_string(),
        product_code: code.to_string(),
        product_name: name.to_string(),
        created_at: "2025-01-15T08:30:00Z".to_string(),
    }
}

/// A stored scan event at a fixed timestamp (`YYYY-MM-DDTHH:MM:SSZ`).
#[allow(dead_code)]
pub fn scan_at(id: &str, user_id: &str, serial: &str, scanned_at: &str) -> ScanEvent {
    ScanEvent {
        id: id.to_string(),
        user_id: user_id.to_string(),
        serial_number: serial.to_string(),
        scan_method: ScanMethod::Camera,
        scanned_at: scanned_at.to_string(),
        scan_date: scanned_at[..10].to_string(),
    }
}

#[allow(dead_code)]
pub fn test_user() -> User {
    User {
        id: "user-1".to_string(),
        email: "juan@example.com".to_string(),
    }
}

/// Memory store seeded with the "Oil X" product under `SN12345`.
#[allow(dead_code)]
pub fn seeded_store() -> Arc<MemoryDb> {
    let db = Arc::new(MemoryDb::new());
    db.insert_product(product("SN12345", "Oil X", "OIL-X"));
    db
}

/// A controller wired to a relay surface and a memory store.
#[allow(dead_code)]
pub struct ScannerHarness {
    pub controller: ScanController,
    pub relay: Arc<RelayCapture>,
    pub db: Arc<MemoryDb>,
    pub session: SessionHolder,
}

#[allow(dead_code)]
pub fn scanner_harness(policy: LedgerPolicy, signed_in: bool) -> ScannerHarness {
    let identity = Arc::new(MemoryIdentity::new());
    let session = if signed_in {
        SessionHolder::restored(identity, test_user())
    } else {
        SessionHolder::new(identity)
    };
    harness_for_session(policy, session)
}

/// Harness around a caller-built session, e.g. one backed by a real
/// provider account.
#[allow(dead_code)]
pub fn harness_for_session(policy: LedgerPolicy, session: SessionHolder) -> ScannerHarness {
    let db = seeded_store();
    let timings = ScanTimings::default();
    let writer = LedgerWriter::new(db.clone(), policy, timings.lookup_timeout);
    let relay = Arc::new(RelayCapture::new());
    let controller = ScanController::new(
        db.clone(),
        writer,
        relay.clone(),
        session.subscribe(),
        timings,
    );

    ScannerHarness {
        controller,
        relay,
        db,
        session,
    }
}

/// Create a test app backed by in-memory stores.
/// Returns the router, the shared state, and the store for seeding.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, Arc<MemoryDb>) {
    let config = Config::test_default();
    let db = seeded_store();
    let identity = Arc::new(MemoryIdentity::new());

    let state = Arc::new(AppState::new(config, db.clone(), db.clone(), identity));

    (create_router(state.clone()), state, db)
}
