// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer: Firestore for deployments, an in-memory store for tests
//! and local runs.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

/// Collection names as constants.
pub mod collections {
    /// Product catalog (keyed by URL-encoded serial number)
    pub const PRODUCTS: &str = "products";
    /// Scan ledger (keyed by event id)
    pub const SCAN_HISTORY: &str = "scan_history";
}
