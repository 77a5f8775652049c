// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Calendar-grouped scan history.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::{Product, ScanEvent};
use crate::time_utils::{format_month, month_range, month_start, shift_month};

/// One scan inside a date bucket, with its joined product (if any).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub scan: ScanEvent,
    pub product: Option<Product>,
}

/// All scans sharing one `scan_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DateBucket {
    /// Calendar date (YYYY-MM-DD)
    pub date: String,
    pub scan_count: u32,
    /// Whether the UI shows this bucket's scans
    pub expanded: bool,
    pub scans: Vec<HistoryEntry>,
}

/// History page for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HistoryMonth {
    /// Month key (YYYY-MM)
    pub month: String,
    /// Number of date buckets
    pub total_folders: u32,
    pub total_scans: u32,
    /// Failed lookups are never logged, so this stays 0.
    pub failed_scans: u32,
    pub buckets: Vec<DateBucket>,
}

/// Partition scans by `scan_date`.
///
/// Buckets appear in the order their first scan appears in `scans`, and scans
/// keep their relative order inside a bucket. No re-sorting happens here.
pub fn group_by_date(scans: Vec<ScanEvent>, products: &HashMap<String, Product>) -> Vec<DateBucket> {
    let mut buckets: Vec<DateBucket> = Vec::new();
    let mut index_by_date: HashMap<String, usize> = HashMap::new();

    for scan in scans {
        let idx = *index_by_date
            .entry(scan.scan_date.clone())
            .or_insert_with(|| {
                buckets.push(DateBucket {
                    date: scan.scan_date.clone(),
                    scan_count: 0,
                    expanded: false,
                    scans: Vec::new(),
                });
                buckets.len() - 1
            });

        let product = products.get(&scan.serial_number).cloned();
        let bucket = &mut buckets[idx];
        bucket.scan_count += 1;
        bucket.scans.push(HistoryEntry { scan, product });
    }

    buckets
}

/// Navigation state of the history page: selected month plus the set of
/// expanded date buckets. Each bucket toggles independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryView {
    month: NaiveDate,
    expanded: BTreeSet<String>,
}

impl HistoryView {
    pub fn new(month: NaiveDate) -> Self {
        Self {
            month: month_start(month),
            expanded: BTreeSet::new(),
        }
    }

    pub fn month_key(&self) -> String {
        format_month(self.month)
    }

    pub fn range(&self) -> crate::models::DateRange {
        month_range(self.month)
    }

    /// Flip one bucket. Returns whether it is now expanded.
    pub fn toggle(&mut self, date: &str) -> bool {
        if self.expanded.remove(date) {
            false
        } else {
            self.expanded.insert(date.to_string());
            true
        }
    }

    pub fn is_expanded(&self, date: &str) -> bool {
        self.expanded.contains(date)
    }

    /// Move the calendar by `delta` months. Expansion state is per month and
    /// is cleared on navigation.
    pub fn change_month(&mut self, delta: i32) {
        if let Some(month) = shift_month(self.month, delta) {
            self.month = month;
            self.expanded.clear();
        }
    }

    /// Build the page from the month's scans (store order) and joined products.
    pub fn render(
        &self,
        scans: Vec<ScanEvent>,
        products: &HashMap<String, Product>,
    ) -> HistoryMonth {
        let total_scans = scans.len() as u32;
        let mut buckets = group_by_date(scans, products);
        for bucket in &mut buckets {
            bucket.expanded = self.is_expanded(&bucket.date);
        }

        HistoryMonth {
            month: self.month_key(),
            total_folders: buckets.len() as u32,
            total_scans,
            failed_scans: 0,
            buckets,
        }
    }
}
