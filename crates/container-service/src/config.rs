//! Configuration management for the Container Logistics Service
//!
//! Loads configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use logistics_common::{HttpInvoker, LedgerBackend};
use std::collections::HashMap;
use std::env;

use crate::history::HistoryRetention;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server host
    pub api_host: String,

    /// API server port
    pub api_port: u16,

    /// Ledger implementation
    pub ledger_backend: LedgerBackend,

    /// Redis connection URL
    pub redis_url: String,

    /// Service id to base URL of the services this one calls
    pub service_endpoints: HashMap<String, String>,

    /// Whether updates keep the whole container history
    pub history_retention: HistoryRetention,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        let config = Config {
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| "8091".to_string())
                .parse()
                .context("Invalid API_PORT")?,

            ledger_backend: env::var("LEDGER_BACKEND")
                .unwrap_or_else(|_| "redis".to_string())
                .parse()
                .context("Invalid LEDGER_BACKEND")?,

            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),

            service_endpoints: HttpInvoker::parse_endpoints(
                &env::var("SERVICE_ENDPOINTS").unwrap_or_default(),
            )
            .context("Invalid SERVICE_ENDPOINTS")?,

            history_retention: env::var("HISTORY_RETENTION")
                .unwrap_or_else(|_| "cumulative".to_string())
                .parse()
                .context("Invalid HISTORY_RETENTION")?,
        };

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.api_port == 0 {
            anyhow::bail!("API_PORT must be greater than 0");
        }

        if self.ledger_backend == LedgerBackend::Redis && self.redis_url.trim().is_empty() {
            anyhow::bail!("REDIS_URL is required when LEDGER_BACKEND=redis");
        }

        Ok(())
    }

    /// Get the API server address
    pub fn api_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}
