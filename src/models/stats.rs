//! Dashboard and report aggregates computed from the scan ledger.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::{ScanEvent, ScanMethod};

/// Number of recent scans shown on the dashboard.
pub const RECENT_SCAN_LIMIT: u32 = 5;

/// Dashboard counters for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DashboardStats {
    /// Products in the whole directory (not per user)
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_products: u64,
    /// Scans by this user with today's `scan_date`
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub today_scans: u64,
    /// All-time scans by this user
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_scans: u64,
    /// Most recent scans, newest first
    pub recent_scans: Vec<RecentScan>,
}

/// One dashboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RecentScan {
    pub serial_number: String,
    /// Joined product name, or "Unknown" when the join misses
    pub product_name: String,
    pub scanned_at: String,
}

/// Scan pattern breakdown for one month.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MonthlyReport {
    /// Month key (YYYY-MM)
    pub month: String,
    pub total_scans: u32,
    /// Distinct serial numbers scanned
    pub distinct_serials: u32,
    /// Scan count per capture method
    pub scans_by_method: BTreeMap<ScanMethod, u32>,
    /// Scan count per calendar date (YYYY-MM-DD)
    pub scans_by_date: BTreeMap<String, u32>,
    /// Scan count per product code (joined; unknown products are skipped)
    pub scans_by_product_code: BTreeMap<String, u32>,
}

impl MonthlyReport {
    pub fn new(month: impl Into<String>) -> Self {
        Self {
            month: month.into(),
            ..Self::default()
        }
    }

    /// Fold one scan into the report.
    ///
    /// `seen_serials` tracks distinct serial numbers across calls.
    pub fn update_from_scan(
        &mut self,
        scan: &ScanEvent,
        product_code: Option<&str>,
        seen_serials: &mut std::collections::HashSet<String>,
    ) {
        self.total_scans += 1;
        *self.scans_by_method.entry(scan.scan_method).or_insert(0) += 1;
        *self
            .scans_by_date
            .entry(scan.scan_date.clone())
            .or_insert(0) += 1;

        if let Some(code) = product_code {
            *self
                .scans_by_product_code
                .entry(code.to_string())
                .or_insert(0) += 1;
        }

        if seen_serials.insert(scan.serial_number.clone()) {
            self.distinct_serials += 1;
        }
    }
}
