// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod aggregation;
pub mod directory;
pub mod identity;
pub mod ledger;

pub use aggregation::AggregationService;
pub use directory::ProductDirectory;
pub use identity::{HostedAuthClient, IdentityError, IdentityProvider, MemoryIdentity};
pub use ledger::{LedgerPolicy, LedgerWriter, ScanLedger};
