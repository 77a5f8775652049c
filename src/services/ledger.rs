// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Append-only scan ledger and the writer used by the scan controller.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::AppError;
use crate::models::{DateRange, NewScan, ScanEvent, ScanMethod, User};

/// Append-only log of scan events.
#[async_trait]
pub trait ScanLedger: Send + Sync {
    /// Append one immutable event.
    async fn append(&self, scan: NewScan) -> Result<ScanEvent, AppError>;

    /// Events for a user with `scan_date` inside `range`, newest first.
    async fn query_by_user(&self, user_id: &str, range: DateRange)
        -> Result<Vec<ScanEvent>, AppError>;

    /// Count events for a user, optionally restricted to one calendar date.
    async fn count_by_user(&self, user_id: &str, date: Option<NaiveDate>) -> Result<u64, AppError>;

    /// The `limit` most recent events for a user, newest first.
    async fn recent_by_user(&self, user_id: &str, limit: u32) -> Result<Vec<ScanEvent>, AppError>;
}

/// When a successful lookup is declared successful relative to its ledger write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerPolicy {
    /// Declare success immediately; a failed write is only logged.
    #[default]
    BestEffort,
    /// Declare success only after the write is acknowledged; a failed write
    /// turns the lookup into a fault.
    Acknowledged,
}

impl FromStr for LedgerPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "best_effort" => Ok(LedgerPolicy::BestEffort),
            "acknowledged" => Ok(LedgerPolicy::Acknowledged),
            other => Err(format!("unknown ledger policy: {other}")),
        }
    }
}

/// Writes scan events on behalf of the signed-in user.
#[derive(Clone)]
pub struct LedgerWriter {
    ledger: Arc<dyn ScanLedger>,
    policy: LedgerPolicy,
    timeout: Duration,
}

impl LedgerWriter {
    pub fn new(ledger: Arc<dyn ScanLedger>, policy: LedgerPolicy, timeout: Duration) -> Self {
        Self {
            ledger,
            policy,
            timeout,
        }
    }

    pub fn policy(&self) -> LedgerPolicy {
        self.policy
    }

    /// Append a scan for `user`.
    ///
    /// Anonymous scans are never logged: with no user this is a no-op that
    /// returns `Ok(None)`.
    pub async fn record(
        &self,
        user: Option<&User>,
        serial_number: &str,
        method: ScanMethod,
    ) -> Result<Option<ScanEvent>, AppError> {
        let Some(user) = user else {
            tracing::debug!(serial_number, "No active session, skipping ledger write");
            return Ok(None);
        };

        let scan = NewScan {
            user_id: user.id.clone(),
            serial_number: serial_number.to_string(),
            scan_method: method,
        };

        let event = tokio::time::timeout(self.timeout, self.ledger.append(scan))
            .await
            .map_err(|_| {
                AppError::Timeout(format!(
                    "ledger append exceeded {} ms",
                    self.timeout.as_millis()
                ))
            })??;

        tracing::info!(
            user_id = %event.user_id,
            serial_number = %event.serial_number,
            method = %event.scan_method,
            scan_id = %event.id,
            "Scan logged"
        );
        Ok(Some(event))
    }
}
