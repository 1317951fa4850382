//! Cross-service invocation protocol
//!
//! Services expose named operations taking a single JSON argument. A caller
//! reaches another service through a [`ServiceInvoker`], either over HTTP or
//! in-process, and blocks until it answers.

use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Error, Result};

/// A ledger-backed service exposing named operations
#[async_trait]
pub trait ContractService: Send + Sync {
    /// Service name used in logs and health responses
    fn name(&self) -> &'static str;

    /// Declare the contract version and dependent service ids
    async fn init(&self, payload: &[u8]) -> Result<()>;

    /// Run `function` with its arguments. Write operations answer with an
    /// empty body.
    async fn invoke(&self, function: &str, args: &[Vec<u8>]) -> Result<Vec<u8>>;
}

/// Synchronous call into another service
#[async_trait]
pub trait ServiceInvoker: Send + Sync {
    async fn invoke(&self, service_id: &str, function: &str, args: Vec<Vec<u8>>)
        -> AnyResult<Vec<u8>>;
}

/// Extract and deserialize the single JSON argument every operation takes
pub fn single_arg<T: DeserializeOwned>(args: &[Vec<u8>]) -> Result<T> {
    match args {
        [payload] => Ok(serde_json::from_slice(payload)?),
        _ => Err(Error::validation(format!(
            "Incorrect number of arguments: expected a single JSON argument, got {}",
            args.len()
        ))),
    }
}

/// Error for an operation name a service does not expose
pub fn unknown_function(service: &str, function: &str) -> Error {
    Error::validation(format!("Received unknown function call to {}: {}", service, function))
}

/// In-process invoker routing calls to registered services
#[derive(Default, Clone)]
pub struct LocalInvoker {
    services: HashMap<String, Arc<dyn ContractService>>,
}

impl LocalInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `service` under `service_id`
    pub fn with_service(mut self, service_id: &str, service: Arc<dyn ContractService>) -> Self {
        self.services.insert(service_id.to_string(), service);
        self
    }
}

#[async_trait]
impl ServiceInvoker for LocalInvoker {
    async fn invoke(
        &self,
        service_id: &str,
        function: &str,
        args: Vec<Vec<u8>>,
    ) -> AnyResult<Vec<u8>> {
        let service = self
            .services
            .get(service_id)
            .with_context(|| format!("Unknown service id: {}", service_id))?;

        debug!("Local invoke {}::{}", service_id, function);

        Ok(service.invoke(function, &args).await?)
    }
}

/// HTTP invoker posting to `{base_url}/api/{function}`
pub struct HttpInvoker {
    endpoints: HashMap<String, String>,
    client: reqwest::Client,
}

impl HttpInvoker {
    /// Create a new invoker from service id to base URL pairs
    pub fn new(endpoints: HashMap<String, String>) -> Self {
        Self {
            endpoints,
            client: reqwest::Client::new(),
        }
    }

    /// Parse `id=url,id=url`
    pub fn parse_endpoints(value: &str) -> AnyResult<HashMap<String, String>> {
        let mut endpoints = HashMap::new();
        for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (id, url) = entry
                .split_once('=')
                .with_context(|| format!("Invalid service endpoint (expected id=url): {}", entry))?;
            endpoints.insert(
                id.trim().to_string(),
                url.trim().trim_end_matches('/').to_string(),
            );
        }
        Ok(endpoints)
    }

    fn url(&self, service_id: &str, function: &str) -> AnyResult<String> {
        let base = self
            .endpoints
            .get(service_id)
            .with_context(|| format!("No endpoint configured for service: {}", service_id))?;
        Ok(format!("{}/api/{}", base, function))
    }
}

#[async_trait]
impl ServiceInvoker for HttpInvoker {
    async fn invoke(
        &self,
        service_id: &str,
        function: &str,
        args: Vec<Vec<u8>>,
    ) -> AnyResult<Vec<u8>> {
        let url = self.url(service_id, function)?;
        let [payload]: [Vec<u8>; 1] = args
            .try_into()
            .map_err(|args: Vec<Vec<u8>>| {
                anyhow::anyhow!("Expected a single argument, got {}", args.len())
            })?;

        debug!("Invoking {} at {}", function, url);

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?;

        let status = response.status();
        let body = response.bytes().await.context("Failed to read response")?;

        if !status.is_success() {
            let message = serde_json::from_slice::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
                .unwrap_or_else(|| String::from_utf8_lossy(&body).into_owned());
            anyhow::bail!("{} returned {}: {}", service_id, status, message);
        }

        Ok(body.to_vec())
    }
}
