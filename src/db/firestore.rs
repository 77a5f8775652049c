// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Products (read-only catalog, provisioned externally)
//! - Scan history (append-only ledger)

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db::collections;
use crate::error::AppError;
use crate::models::{DateRange, NewScan, Product, ScanEvent};
use crate::services::directory::ProductDirectory;
use crate::services::ledger::ScanLedger;
use crate::time_utils::format_scan_date;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

/// Row returned by a server-side count aggregation.
#[derive(Debug, Serialize, Deserialize)]
struct CountAggregate {
    count: u64,
}

impl CountAggregate {
    fn total(rows: &[CountAggregate]) -> u64 {
        rows.first().map_or(0, |row| row.count)
    }
}

/// Document id for a product. Serial numbers may contain `/`.
pub fn product_doc_id(serial_number: &str) -> String {
    urlencoding::encode(serial_number).into_owned()
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // Emulator: unauthenticated connection, no local credentials involved.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Provisioning ────────────────────────────────────────────

    /// Write a product record.
    ///
    /// The service itself never calls this; it exists for seeding the
    /// emulator and for the provisioning tooling.
    pub async fn put_product(&self, product: &Product) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PRODUCTS)
            .document_id(product_doc_id(&product.serial_number))
            .object(product)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete every scan event owned by `user_id`. Test cleanup only.
    pub async fn delete_scans_for_user(&self, user_id: &str) -> Result<usize, AppError> {
        let client = self.get_client()?;
        let user_id = user_id.to_string();

        let scans: Vec<ScanEvent> = client
            .fluent()
            .select()
            .from(collections::SCAN_HISTORY)
            .filter(|q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        for scan in &scans {
            client
                .fluent()
                .delete()
                .from(collections::SCAN_HISTORY)
                .document_id(&scan.id)
                .execute()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        tracing::debug!(user_id = %user_id, count = scans.len(), "Deleted scan history");
        Ok(scans.len())
    }
}

// ─── Product Directory ───────────────────────────────────────────

#[async_trait]
impl ProductDirectory for FirestoreDb {
    async fn find_by_serial(&self, serial_number: &str) -> Result<Option<Product>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PRODUCTS)
            .obj()
            .one(&product_doc_id(serial_number))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Counted server-side (one aggregation read, no documents transferred).
    async fn count_all(&self) -> Result<u64, AppError> {
        let rows: Vec<CountAggregate> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::PRODUCTS)
            .aggregate(|a| a.fields([a.field("count").count()]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(CountAggregate::total(&rows))
    }
}

// ─── Scan Ledger ─────────────────────────────────────────────────

#[async_trait]
impl ScanLedger for FirestoreDb {
    async fn append(&self, scan: NewScan) -> Result<ScanEvent, AppError> {
        let event = scan.into_event(Utc::now());

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::SCAN_HISTORY)
            .document_id(&event.id)
            .object(&event)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(event)
    }

    async fn query_by_user(
        &self,
        user_id: &str,
        range: DateRange,
    ) -> Result<Vec<ScanEvent>, AppError> {
        let user_id = user_id.to_string();
        let start = format_scan_date(range.start);
        let end = format_scan_date(range.end);

        // Range filter on scan_date forces it to lead the ordering.
        self.get_client()?
            .fluent()
            .select()
            .from(collections::SCAN_HISTORY)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id.clone()),
                    q.field("scan_date").greater_than_or_equal(start.clone()),
                    q.field("scan_date").less_than_or_equal(end.clone()),
                ])
            })
            .order_by([
                ("scan_date", firestore::FirestoreQueryDirection::Descending),
                ("scanned_at", firestore::FirestoreQueryDirection::Descending),
            ])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn count_by_user(&self, user_id: &str, date: Option<NaiveDate>) -> Result<u64, AppError> {
        let user_id = user_id.to_string();
        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::SCAN_HISTORY);

        let query = if let Some(date) = date {
            let scan_date = format_scan_date(date);
            query.filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id.clone()),
                    q.field("scan_date").eq(scan_date.clone()),
                ])
            })
        } else {
            query.filter(move |q| q.field("user_id").eq(user_id.clone()))
        };

        let rows: Vec<CountAggregate> = query
            .aggregate(|a| a.fields([a.field("count").count()]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(CountAggregate::total(&rows))
    }

    async fn recent_by_user(&self, user_id: &str, limit: u32) -> Result<Vec<ScanEvent>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::SCAN_HISTORY)
            .filter(move |q| q.field("user_id").eq(user_id.clone()))
            .order_by([("scanned_at", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
