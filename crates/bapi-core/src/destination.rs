//! Destinations - named, pooled connection configurations
//!
//! A [`Destination`] bounds the number of concurrent backend contexts with a
//! semaphore and keeps released connections on an idle stack for reuse.
//! [`Destination::acquire`] hands out a [`Session`], which gives its
//! connection and permit back on drop.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::connector::{Connection, Connector};
use crate::error::{RfcError, RfcResult};
use crate::gateway::Session;
use crate::models::FunctionSignature;

/// Connection parameters for one backend system
#[derive(Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// Application server host
    pub host: String,
    /// Instance number (e.g., "00")
    #[serde(default = "default_system_number")]
    pub system_number: String,
    /// Three-character system identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_id: Option<String>,
    /// Client / tenant (e.g., "001")
    pub client: String,
    pub user: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    /// Logon language
    #[serde(default = "default_language")]
    pub language: String,
    /// Maximum number of concurrent connections
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// How long to wait for a free connection before failing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquire_timeout_ms: Option<u64>,
    /// Ask the backend to wait for the update task on commit
    #[serde(default)]
    pub commit_wait: bool,
}

fn default_system_number() -> String {
    "00".to_string()
}

fn default_language() -> String {
    "EN".to_string()
}

fn default_pool_size() -> usize {
    5
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            system_number: default_system_number(),
            system_id: None,
            client: "001".to_string(),
            user: String::new(),
            password: String::new(),
            language: default_language(),
            pool_size: default_pool_size(),
            acquire_timeout_ms: None,
            commit_wait: false,
        }
    }
}

impl fmt::Debug for DestinationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DestinationConfig")
            .field("host", &self.host)
            .field("system_number", &self.system_number)
            .field("system_id", &self.system_id)
            .field("client", &self.client)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("language", &self.language)
            .field("pool_size", &self.pool_size)
            .field("acquire_timeout_ms", &self.acquire_timeout_ms)
            .field("commit_wait", &self.commit_wait)
            .finish()
    }
}

struct Pool {
    name: String,
    config: DestinationConfig,
    connector: Arc<dyn Connector>,
    permits: Arc<Semaphore>,
    idle: Mutex<Vec<Box<dyn Connection>>>,
    signatures: RwLock<HashMap<String, Arc<FunctionSignature>>>,
}

/// A resolved, pooled destination. Cheap to clone.
#[derive(Clone)]
pub struct Destination {
    pool: Arc<Pool>,
}

impl Destination {
    pub fn new(
        name: impl Into<String>,
        config: DestinationConfig,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let name = name.into();
        let size = if config.pool_size == 0 {
            warn!(destination = %name, "pool_size 0 is not usable, using 1");
            1
        } else {
            config.pool_size
        };

        info!(
            destination = %name,
            host = %config.host,
            client = %config.client,
            pool_size = size,
            "Destination configured"
        );

        Self {
            pool: Arc::new(Pool {
                name,
                config,
                connector,
                permits: Arc::new(Semaphore::new(size)),
                idle: Mutex::new(Vec::new()),
                signatures: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.pool.name
    }

    pub fn config(&self) -> &DestinationConfig {
        &self.pool.config
    }

    /// Number of sessions that could be acquired right now without waiting
    pub fn available(&self) -> usize {
        self.pool.permits.available_permits()
    }

    /// Number of open connections waiting for reuse
    pub fn idle_connections(&self) -> usize {
        self.pool.idle.lock().len()
    }

    /// Acquire a pooled session.
    ///
    /// Waits for a free slot (bounded by `acquire_timeout_ms` when set), then
    /// reuses an idle connection or opens a new one.
    pub async fn acquire(&self) -> RfcResult<Session> {
        let permits = self.pool.permits.clone();
        let permit = match self.pool.config.acquire_timeout_ms {
            Some(ms) => tokio::time::timeout(Duration::from_millis(ms), permits.acquire_owned())
                .await
                .map_err(|_| {
                    RfcError::Connection(format!(
                        "{}: no pooled connection available within {} ms",
                        self.pool.name, ms
                    ))
                })?,
            None => permits.acquire_owned().await,
        }
        .map_err(|_| RfcError::Connection(format!("{}: connection pool closed", self.pool.name)))?;

        let reused = self.pool.idle.lock().pop();
        let connection = match reused {
            Some(connection) => connection,
            None => {
                debug!(destination = %self.pool.name, "Opening new connection");
                self.pool.connector.connect(&self.pool.config).await?
            }
        };

        Ok(Session::new(self.clone(), connection, permit))
    }

    pub(crate) fn release(&self, connection: Box<dyn Connection>) {
        self.pool.idle.lock().push(connection);
    }

    pub(crate) fn cached_signature(&self, function: &str) -> Option<Arc<FunctionSignature>> {
        self.pool.signatures.read().get(function).cloned()
    }

    pub(crate) fn cache_signature(&self, signature: FunctionSignature) -> Arc<FunctionSignature> {
        let signature = Arc::new(signature);
        self.pool
            .signatures
            .write()
            .insert(signature.name.clone(), signature.clone());
        signature
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("name", &self.pool.name)
            .field("config", &self.pool.config)
            .finish()
    }
}

/// Resolves logical destination names to pooled destinations
pub trait DestinationProvider: Send + Sync {
    /// Fails with [`RfcError::Connection`] if the name is not configured
    fn resolve(&self, name: &str) -> RfcResult<Destination>;
}

/// Destinations built once at startup, immutable afterwards
#[derive(Default)]
pub struct DestinationRegistry {
    destinations: HashMap<String, Destination>,
}

impl DestinationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, destination: Destination) {
        self.destinations
            .insert(destination.name().to_string(), destination);
    }

    pub fn names(&self) -> Vec<&str> {
        self.destinations.keys().map(String::as_str).collect()
    }
}

impl DestinationProvider for DestinationRegistry {
    fn resolve(&self, name: &str) -> RfcResult<Destination> {
        self.destinations
            .get(name)
            .cloned()
            .ok_or_else(|| RfcError::Connection(format!("Destination not configured: {}", name)))
    }
}
