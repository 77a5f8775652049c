// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard, history and report aggregation.
//!
//! Read-only: combines ledger queries with product joins. A scan whose
//! product has vanished from the directory still shows up, under
//! [`UNKNOWN_PRODUCT_NAME`].

use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::Result;
use crate::models::stats::RECENT_SCAN_LIMIT;
use crate::models::{
    DashboardStats, HistoryMonth, HistoryView, MonthlyReport, RecentScan, ScanEvent,
    UNKNOWN_PRODUCT_NAME,
};
use crate::services::directory::ProductDirectory;
use crate::services::ledger::ScanLedger;
use crate::time_utils::month_range;

#[derive(Clone)]
pub struct AggregationService {
    directory: Arc<dyn ProductDirectory>,
    ledger: Arc<dyn ScanLedger>,
}

fn serials(scans: &[ScanEvent]) -> Vec<String> {
    scans.iter().map(|s| s.serial_number.clone()).collect()
}

impl AggregationService {
    pub fn new(directory: Arc<dyn ProductDirectory>, ledger: Arc<dyn ScanLedger>) -> Self {
        Self { directory, ledger }
    }

    /// Dashboard counters for `user_id`, with `today` as the current date.
    pub async fn dashboard(&self, user_id: &str, today: NaiveDate) -> Result<DashboardStats> {
        let (total_products, today_scans, total_scans, recent) = tokio::try_join!(
            self.directory.count_all(),
            self.ledger.count_by_user(user_id, Some(today)),
            self.ledger.count_by_user(user_id, None),
            self.ledger.recent_by_user(user_id, RECENT_SCAN_LIMIT),
        )?;

        let products = self.directory.find_many(&serials(&recent)).await?;
        let recent_scans = recent
            .into_iter()
            .map(|scan| RecentScan {
                product_name: products
                    .get(&scan.serial_number)
                    .map(|p| p.product_name.clone())
                    .unwrap_or_else(|| UNKNOWN_PRODUCT_NAME.to_string()),
                serial_number: scan.serial_number,
                scanned_at: scan.scanned_at,
            })
            .collect();

        tracing::debug!(user_id, today_scans, total_scans, "Dashboard computed");

        Ok(DashboardStats {
            total_products,
            today_scans,
            total_scans,
            recent_scans,
        })
    }

    /// History page for the month `view` is on.
    pub async fn history(&self, user_id: &str, view: &HistoryView) -> Result<HistoryMonth> {
        let scans = self.ledger.query_by_user(user_id, view.range()).await?;
        let products = self.directory.find_many(&serials(&scans)).await?;
        Ok(view.render(scans, &products))
    }

    /// Scan-pattern breakdown for the month containing `month`.
    pub async fn report(&self, user_id: &str, month: NaiveDate) -> Result<MonthlyReport> {
        let view = HistoryView::new(month);
        let scans = self.ledger.query_by_user(user_id, month_range(month)).await?;
        let products = self.directory.find_many(&serials(&scans)).await?;

        let mut report = MonthlyReport::new(view.month_key());
        let mut seen = HashSet::new();
        for scan in &scans {
            let code = products
                .get(&scan.serial_number)
                .map(|p| p.product_code.as_str());
            report.update_from_scan(scan, code, &mut seen);
        }
        Ok(report)
    }
}
