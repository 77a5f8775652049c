//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honored for local development.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::scanner::ScanTimings;
use crate::services::ledger::LedgerPolicy;

/// Which backend serves the product directory and scan ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    /// Process-local store, empty at startup
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StoreBackend::Firestore),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL (CORS origin)
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    pub store_backend: StoreBackend,
    /// Identity provider base URL; `None` uses the in-memory provider
    pub auth_url: Option<String>,

    // --- Scanner tuning ---
    pub scan_timings: ScanTimings,
    pub ledger_policy: LedgerPolicy,

    // --- Secrets ---
    /// Identity provider API key
    pub auth_api_key: String,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self::test_default()
    }
}

impl Config {
    /// In-memory stores, in-memory identity, default timings.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            store_backend: StoreBackend::Memory,
            auth_url: None,
            scan_timings: ScanTimings::default(),
            ledger_policy: LedgerPolicy::BestEffort,
            auth_api_key: "test_api_key".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = ScanTimings::default();
        let auth_url = env::var("AUTH_URL")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: parse_var("PORT", 8080)?,
            store_backend: parse_var("STORE_BACKEND", StoreBackend::Firestore)?,
            auth_api_key: match auth_url {
                Some(_) => env::var("AUTH_API_KEY")
                    .map(|v| v.trim().to_string())
                    .map_err(|_| ConfigError::Missing("AUTH_API_KEY"))?,
                None => String::new(),
            },
            auth_url,
            scan_timings: ScanTimings {
                settle: millis_var("SCAN_SETTLE_MS", defaults.settle)?,
                hold: millis_var("SCAN_HOLD_MS", defaults.hold)?,
                lookup_timeout: millis_var("LOOKUP_TIMEOUT_MS", defaults.lookup_timeout)?,
            },
            ledger_policy: parse_var("LEDGER_POLICY", LedgerPolicy::default())?,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
        })
    }
}

fn parse_var<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|e: T::Err| {
            ConfigError::Invalid {
                name,
                reason: e.to_string(),
            }
        }),
        _ => Ok(default),
    }
}

fn millis_var(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    let default_ms = default.as_millis() as u64;
    parse_var(name, default_ms).map(Duration::from_millis)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}
