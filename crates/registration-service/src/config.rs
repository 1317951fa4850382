//! Configuration for the Registration Service

use anyhow::{Context, Result};
use logistics_common::{HttpInvoker, LedgerBackend};
use std::collections::HashMap;
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api_host: String,
    pub api_port: u16,
    pub ledger_backend: LedgerBackend,
    pub redis_url: String,

    /// Service id to base URL; must cover the container and compliance ids
    /// declared at init
    pub service_endpoints: HashMap<String, String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| "8090".to_string())
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
        };

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.api_port == 0 {
            anyhow::bail!("API_PORT must be greater than 0");
        }

        if self.ledger_backend == LedgerBackend::Redis && self.redis_url.trim().is_empty() {
            anyhow::bail!("REDIS_URL is required when LEDGER_BACKEND=redis");
        }

        if self.service_endpoints.is_empty() {
            tracing::warn!("SERVICE_ENDPOINTS is empty, registrations will fail to reach dependencies");
        }

        Ok(())
    }

    pub fn api_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        let config = Config {
            api_host: "0.0.0.0".to_string(),
            api_port: 8090,
            ledger_backend: LedgerBackend::Memory,
            redis_url: String::new(),
            service_endpoints: HttpInvoker::parse_endpoints("container-cc=http://localhost:8091")
                .unwrap(),
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.api_address(), "0.0.0.0:8090");

        let config = Config {
            api_port: 0,
            ..config
        };
        assert!(config.validate().is_err());
    }
}
