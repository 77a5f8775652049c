// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, Datelike, Months, NaiveDate, SecondsFormat, Utc};

use crate::models::DateRange;

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Format a calendar date the way `scan_date` is stored (YYYY-MM-DD).
pub fn format_scan_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a stored `scan_date`.
pub fn parse_scan_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Parse a `YYYY-MM` month key into the first day of that month.
pub fn parse_month(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", raw.trim()), "%Y-%m-%d").ok()
}

/// Format the month containing `date` as `YYYY-MM`.
pub fn format_month(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Move a month start forward or backward by `delta` months.
pub fn shift_month(month: NaiveDate, delta: i32) -> Option<NaiveDate> {
    let start = month_start(month);
    let months = Months::new(delta.unsigned_abs());
    if delta >= 0 {
        start.checked_add_months(months)
    } else {
        start.checked_sub_months(months)
    }
}

/// Inclusive date range covering the whole month containing `date`.
pub fn month_range(date: NaiveDate) -> DateRange {
    let start = month_start(date);
    let end = start
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(start);
    DateRange { start, end }
}
