//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if required vars are missing or malformed.
//! The database URL is wrapped in secrecy::SecretString to keep credentials
//! out of logs.

pub mod secrets;

use crate::error::{Error, Result};
use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;

/// Dataset location used when an ingestion job does not name one.
pub const DEFAULT_DATASET_PATH: &str = "/app/spotify-2023.csv";

/// Backoff between polls when the queue is empty.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug)]
pub struct Config {
    pub database_url: SecretString,
    pub dataset_path: PathBuf,
    pub poll_interval: Duration,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let poll_interval = match std::env::var("POLL_INTERVAL_MS") {
            Ok(raw) => {
                let ms: u64 = raw.trim().parse().map_err(|_| {
                    Error::Config(format!("POLL_INTERVAL_MS must be an integer, got {raw:?}"))
                })?;
                Duration::from_millis(ms)
            }
            Err(_) => DEFAULT_POLL_INTERVAL,
        };

        Ok(Self {
            database_url: SecretString::from(required_var("DATABASE_URL")?),
            dataset_path: std::env::var("DATASET_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATASET_PATH)),
            poll_interval,
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::Config(format!("required environment variable {name} is not set")))
}
