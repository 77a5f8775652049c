// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory product directory and scan ledger.
//!
//! Used by `STORE_BACKEND=memory` and by tests, which can inject faults and
//! latency through the knobs below.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::error::AppError;
use crate::models::{DateRange, NewScan, Product, ScanEvent};
use crate::services::directory::ProductDirectory;
use crate::services::ledger::ScanLedger;
use crate::time_utils::format_scan_date;

#[derive(Default)]
pub struct MemoryDb {
    products: DashMap<String, Product>,
    /// Scan events in append order.
    scans: Mutex<Vec<ScanEvent>>,
    offline: AtomicBool,
    fail_appends: AtomicBool,
    lookup_delay_ms: AtomicU64,
    append_delay_ms: AtomicU64,
    lookup_calls: AtomicU64,
    append_calls: AtomicU64,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_product(&self, product: Product) {
        self.products.insert(product.serial_number.clone(), product);
    }

    /// Seed a pre-built event (bypasses `append`, keeps its timestamps).
    pub fn insert_scan(&self, scan: ScanEvent) {
        self.scans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(scan);
    }

    /// Every stored event, in append order.
    pub fn scans(&self) -> Vec<ScanEvent> {
        self.scans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Make every operation fail as if the store were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make only `append` fail.
    pub fn set_fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Delay every `find_by_serial` call.
    pub fn set_lookup_delay(&self, delay: Duration) {
        self.lookup_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Delay every `append` call.
    pub fn set_append_delay(&self, delay: Duration) {
        self.append_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn lookup_calls(&self) -> u64 {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    pub fn append_calls(&self) -> u64 {
        self.append_calls.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<(), AppError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::Database("store unreachable".to_string()));
        }
        Ok(())
    }

    /// Events matching `keep`, newest first. Ties keep the newest append first.
    fn select_newest_first(&self, keep: impl Fn(&ScanEvent) -> bool) -> Vec<ScanEvent> {
        let mut selected: Vec<ScanEvent> = self
            .scans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .filter(|s| keep(s))
            .cloned()
            .collect();
        selected.sort_by(|a, b| b.scanned_at.cmp(&a.scanned_at));
        selected
    }
}

#[async_trait]
impl ProductDirectory for MemoryDb {
    async fn find_by_serial(&self, serial_number: &str) -> Result<Option<Product>, AppError> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.lookup_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        self.check_online()?;
        Ok(self.products.get(serial_number).map(|p| p.value().clone()))
    }

    async fn count_all(&self) -> Result<u64, AppError> {
        self.check_online()?;
        Ok(self.products.len() as u64)
    }
}

#[async_trait]
impl ScanLedger for MemoryDb {
    async fn append(&self, scan: NewScan) -> Result<ScanEvent, AppError> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.append_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        self.check_online()?;
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(AppError::Database("append rejected".to_string()));
        }

        let event = scan.into_event(Utc::now());
        self.insert_scan(event.clone());
        Ok(event)
    }

    async fn query_by_user(
        &self,
        user_id: &str,
        range: DateRange,
    ) -> Result<Vec<ScanEvent>, AppError> {
        self.check_online()?;
        Ok(self.select_newest_first(|s| s.user_id == user_id && range.contains_str(&s.scan_date)))
    }

    async fn count_by_user(&self, user_id: &str, date: Option<NaiveDate>) -> Result<u64, AppError> {
        self.check_online()?;
        let scan_date = date.map(format_scan_date);
        let count = self
            .scans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.user_id == user_id)
            .filter(|s| scan_date.as_ref().map_or(true, |d| &s.scan_date == d))
            .count();
        Ok(count as u64)
    }

    async fn recent_by_user(&self, user_id: &str, limit: u32) -> Result<Vec<ScanEvent>, AppError> {
        self.check_online()?;
        let mut recent = self.select_newest_first(|s| s.user_id == user_id);
        recent.truncate(limit as usize);
        Ok(recent)
    }
}
