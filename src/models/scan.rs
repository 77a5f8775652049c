// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Scan history (ledger) records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::time_utils::{format_scan_date, format_utc_rfc3339, parse_scan_date};

/// How a serial number was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum ScanMethod {
    Camera,
    Manual,
    /// Bulk spreadsheet import
    Excel,
}

impl ScanMethod {
    pub const ALL: [ScanMethod; 3] = [ScanMethod::Camera, ScanMethod::Manual, ScanMethod::Excel];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanMethod::Camera => "camera",
            ScanMethod::Manual => "manual",
            ScanMethod::Excel => "excel",
        }
    }
}

impl fmt::Display for ScanMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "camera" => Ok(ScanMethod::Camera),
            "manual" => Ok(ScanMethod::Manual),
            "excel" => Ok(ScanMethod::Excel),
            other => Err(format!("unknown scan method: {other}")),
        }
    }
}

/// One logged lookup, stored in the `scan_history` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ScanEvent {
    /// Event ID (UUID v4, also used as document ID)
    pub id: String,
    /// Owning user
    pub user_id: String,
    pub serial_number: String,
    pub scan_method: ScanMethod,
    /// Capture timestamp (RFC3339, UTC)
    pub scanned_at: String,
    /// Calendar date of `scanned_at` (YYYY-MM-DD), used for grouping
    pub scan_date: String,
}

/// Ledger append request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScan {
    pub user_id: String,
    pub serial_number: String,
    pub scan_method: ScanMethod,
}

impl NewScan {
    /// Materialize the stored event, deriving the calendar date from the timestamp.
    pub fn into_event(self, scanned_at: DateTime<Utc>) -> ScanEvent {
        ScanEvent {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: self.user_id,
            serial_number: self.serial_number,
            scan_method: self.scan_method,
            scanned_at: format_utc_rfc3339(scanned_at),
            scan_date: format_scan_date(scanned_at.date_naive()),
        }
    }
}

/// Inclusive calendar-date range for ledger queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Does a stored `scan_date` string fall in the range?
    pub fn contains_str(&self, scan_date: &str) -> bool {
        parse_scan_date(scan_date).is_some_and(|d| self.contains(d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn scan_method_round_trips_through_strings() {
        for method in ScanMethod::ALL {
            assert_eq!(method.as_str().parse::<ScanMethod>().unwrap(), method);
        }
        assert!("barcode".parse::<ScanMethod>().is_err());
    }

    #[test]
    fn scan_method_serializes_lowercase() {
        let json = serde_json::to_string(&ScanMethod::Manual).unwrap();
        assert_eq!(json, "\"manual\"");
    }

    #[test]
    fn into_event_derives_scan_date() {
        let at = Utc.with_ymd_and_hms(2025, 3, 9, 23, 59, 30).unwrap();
        let event = NewScan {
            user_id: "user-1".to_string(),
            serial_number: "SN1".to_string(),
            scan_method: ScanMethod::Camera,
        }
        .into_event(at);

        assert_eq!(event.scan_date, "2025-03-09");
        assert_eq!(event.scanned_at, "2025-03-09T23:59:30Z");
        assert!(!event.id.is_empty());
    }

    #[test]
    fn date_range_is_inclusive() {
        let range = DateRange {
            start: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
        };
        assert!(range.contains_str("2025-03-01"));
        assert!(range.contains_str("2025-03-31"));
        assert!(!range.contains_str("2025-04-01"));
        assert!(!range.contains_str("garbage"));
    }
}
