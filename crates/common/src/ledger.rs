//! Ledger accessor
//!
//! All service state is stored as opaque serialized records keyed by string.
//! Two backends are provided: Redis for deployments and an in-process map
//! for tests and local runs.
//!
//! Key layout:
//! - `{blno}` → registration record (registration ledger)
//! - `{blno}_SAGA` → registration saga marker (registration ledger)
//! - `{containerno}` → live container record
//! - `{containerno}_{old blno}` → archived container record
//! - `{containerno}_HISTORY` → container history log
//! - `{blno}_REGISTRATION` → shipment terms snapshot (container ledger)

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Suffixes the key scheme appends to container and B/L numbers
pub const RESERVED_KEY_SUFFIXES: [&str; 3] = ["HISTORY", "REGISTRATION", "SAGA"];

/// Reject a B/L number that would alias a derived key.
///
/// Archived containers live under `<C>_<BL>`, so a B/L named after a key
/// suffix would overwrite `<C>_HISTORY` and its siblings.
pub fn check_bl_no(bl_no: &str) -> Result<()> {
    if RESERVED_KEY_SUFFIXES.contains(&bl_no) {
        return Err(Error::validation(format!(
            "Bill of Lading number {} is reserved by the ledger key scheme",
            bl_no
        )));
    }
    Ok(())
}

pub fn history_key(container_no: &str) -> String {
    format!("{}_HISTORY", container_no)
}

pub fn archive_key(container_no: &str, old_bl_no: &str) -> String {
    format!("{}_{}", container_no, old_bl_no)
}

pub fn shipment_terms_key(bl_no: &str) -> String {
    format!("{}_REGISTRATION", bl_no)
}

pub fn saga_key(bl_no: &str) -> String {
    format!("{}_SAGA", bl_no)
}

/// Key-value store every service operation reads and writes through
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Timestamp of the operation in flight
    fn transaction_time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Transaction time rendered the way records store it
pub fn timestamp_string(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Read and deserialize a record
pub async fn get_json<T: DeserializeOwned>(ledger: &dyn Ledger, key: &str) -> Result<Option<T>> {
    match ledger.get(key).await? {
        Some(bytes) if !bytes.is_empty() => Ok(Some(serde_json::from_slice(&bytes)?)),
        _ => Ok(None),
    }
}

/// Serialize and write a record
pub async fn put_json<T: Serialize>(ledger: &dyn Ledger, key: &str, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)?;
    ledger.put(key, bytes).await
}

/// In-process ledger
#[derive(Default)]
pub struct MemoryLedger {
    state: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently stored, sorted
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.state.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.state.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.state.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.state.write().await.remove(key);
        Ok(())
    }
}

/// Redis-backed ledger; every key lives under `{namespace}:`
pub struct RedisLedger {
    conn: ConnectionManager,
    namespace: String,
}

impl RedisLedger {
    /// Create a new ledger instance
    pub async fn new(redis_url: &str, namespace: &str) -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;

        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        info!("Connected to Redis at {} (namespace {})", redis_url, namespace);

        Ok(Self {
            conn,
            namespace: namespace.to_string(),
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    /// Health check - verify Redis connection
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl Ledger for RedisLedger {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(self.key(key)).await?;
        debug!("GET {} -> {}", key, if value.is_some() { "hit" } else { "miss" });
        Ok(value)
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(self.key(key), value).await?;
        debug!("SET {}", key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(self.key(key)).await?;
        Ok(())
    }
}

/// Which ledger implementation a service runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerBackend {
    Redis,
    Memory,
}

impl FromStr for LedgerBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(LedgerBackend::Redis),
            "memory" => Ok(LedgerBackend::Memory),
            other => anyhow::bail!("Unknown ledger backend: {} (expected redis or memory)", other),
        }
    }
}

/// Open the configured ledger
pub async fn connect(
    backend: LedgerBackend,
    redis_url: &str,
    namespace: &str,
) -> anyhow::Result<Arc<dyn Ledger>> {
    match backend {
        LedgerBackend::Redis => {
            let ledger = RedisLedger::new(redis_url, namespace).await?;
            ledger.health_check().await?;
            Ok(Arc::new(ledger))
        }
        LedgerBackend::Memory => {
            info!("Using in-memory ledger for {}", namespace);
            Ok(Arc::new(MemoryLedger::new()))
        }
    }
}
