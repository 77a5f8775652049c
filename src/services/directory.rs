// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-only product directory gateway.

use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use std::collections::HashMap;

use crate::error::AppError;
use crate::models::Product;

/// Maximum concurrent single lookups when joining many serial numbers.
pub const MAX_CONCURRENT_LOOKUPS: usize = 16;

/// Lookup of product records by serial number.
///
/// `Ok(None)` is a normal "not found" outcome; `Err` means the query itself
/// failed. Every call is a fresh query, nothing is cached.
#[async_trait]
pub trait ProductDirectory: Send + Sync {
    /// Find the product with exactly this serial number.
    async fn find_by_serial(&self, serial_number: &str) -> Result<Option<Product>, AppError>;

    /// Number of products in the directory.
    async fn count_all(&self) -> Result<u64, AppError>;

    /// Resolve many serial numbers at once. Misses are simply absent from the map.
    async fn find_many(&self, serials: &[String]) -> Result<HashMap<String, Product>, AppError> {
        let mut unique: Vec<String> = serials.to_vec();
        unique.sort();
        unique.dedup();

        let found = stream::iter(unique)
            .map(|serial| async move { self.find_by_serial(&serial).await })
            .buffer_unordered(MAX_CONCURRENT_LOOKUPS)
            .collect::<Vec<Result<Option<Product>, AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<Option<Product>>, AppError>>()?;

        Ok(found
            .into_iter()
            .flatten()
            .map(|p| (p.serial_number.clone(), p))
            .collect())
    }
}
