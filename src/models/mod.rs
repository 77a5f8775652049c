// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod history;
pub mod page;
pub mod product;
pub mod scan;
pub mod stats;
pub mod user;

pub use history::{DateBucket, HistoryEntry, HistoryMonth, HistoryView};
pub use page::{NavItem, Page};
pub use product::{Product, UNKNOWN_PRODUCT_NAME};
pub use scan::{DateRange, NewScan, ScanEvent, ScanMethod};
pub use stats::{DashboardStats, MonthlyReport, RecentScan};
pub use user::User;
