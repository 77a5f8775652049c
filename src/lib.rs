// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Scan-Tracker: product serial scanning and scan history.
//!
//! This crate provides the backend API behind the scanner UI: identity
//! sessions, product lookups by serial number, the scan ledger, and the
//! dashboard/history aggregates built from it.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod scanner;
pub mod services;
pub mod session;
pub mod time_utils;
pub mod validation;

use std::sync::Arc;

use config::Config;
use middleware::auth::RevokedTokens;
use scanner::ScannerRegistry;
use services::{AggregationService, IdentityProvider, LedgerWriter, ProductDirectory, ScanLedger};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub directory: Arc<dyn ProductDirectory>,
    pub ledger: Arc<dyn ScanLedger>,
    pub identity: Arc<dyn IdentityProvider>,
    pub aggregation: AggregationService,
    pub scanners: ScannerRegistry,
    /// Session tokens ended by sign-out
    pub revoked_tokens: RevokedTokens,
}

impl AppState {
    pub fn new(
        config: Config,
        directory: Arc<dyn ProductDirectory>,
        ledger: Arc<dyn ScanLedger>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let timings = config.scan_timings;
        let writer = LedgerWriter::new(ledger.clone(), config.ledger_policy, timings.lookup_timeout);
        let scanners =
            ScannerRegistry::new(directory.clone(), writer, identity.clone(), timings);
        let aggregation = AggregationService::new(directory.clone(), ledger.clone());

        Self {
            config,
            directory,
            ledger,
            identity,
            aggregation,
            scanners,
            revoked_tokens: RevokedTokens::new(),
        }
    }
}
