// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Product catalog record.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Product record stored in the `products` collection.
///
/// Written only by the external provisioning process; this service never
/// mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Product {
    /// Unique serial number (also the document key)
    pub serial_number: String,
    /// Packaging descriptor, e.g. "Drum 209L"
    pub packaging: String,
    /// Production order identifier
    pub production_order: String,
    /// Storage location
    pub location: String,
    /// Production date (YYYY-MM-DD)
    pub production_date: String,
    /// Production time of day (HH:MM:SS)
    pub production_time: String,
    pub product_code: String,
    /// Display name
    pub product_name: String,
    /// When the record was provisioned (RFC3339)
    pub created_at: String,
}

/// Display name used when a scan no longer joins to a product.
pub const UNKNOWN_PRODUCT_NAME: &str = "Unknown";
