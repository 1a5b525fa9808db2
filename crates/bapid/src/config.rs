//! TOML configuration for the daemon
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0"
//! port = 18090
//!
//! [backend]
//! destination = "SAP_DEST"
//! user_delete_function = "SUSR_USER_DELETE"
//!
//! [destinations.SAP_DEST]
//! host = "sap.example.com"
//! client = "001"
//! user = "RFC_USER"
//! password = "secret"
//! pool_size = 5
//! connector = { type = "simulated", latency_ms = 20, seed_demo_data = true }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Context};
use bapi_api::state::DEFAULT_USER_DELETE_FUNCTION;
use bapi_core::{Connector, Destination, DestinationConfig, DestinationRegistry};
use bapi_sim::{SimConfig, SimulatedConnector};
use serde::Deserialize;

pub const DEFAULT_DESTINATION: &str = "SAP_DEST";

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    18090
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

/// Which destination the routes use and how users are deleted
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_destination")]
    pub destination: String,
    #[serde(default = "default_user_delete_function")]
    pub user_delete_function: String,
}

fn default_destination() -> String {
    DEFAULT_DESTINATION.to_string()
}

fn default_user_delete_function() -> String {
    DEFAULT_USER_DELETE_FUNCTION.to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            destination: default_destination(),
            user_delete_function: default_user_delete_function(),
        }
    }
}

/// Connector implementation behind a destination
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConnectorConfig {
    /// In-memory simulated backend
    Simulated(SimConfig),
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self::Simulated(SimConfig::default())
    }
}

/// One `[destinations.<NAME>]` table
#[derive(Debug, Clone, Deserialize)]
pub struct DestinationEntry {
    #[serde(flatten)]
    pub settings: DestinationConfig,
    #[serde(default)]
    pub connector: ConnectorConfig,
}

/// Top-level daemon configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct BridgeConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub destinations: BTreeMap<String, DestinationEntry>,
}

impl BridgeConfig {
    /// Load and validate configuration from a TOML file
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path))?;
        Self::parse(&content).with_context(|| format!("Invalid config file '{}'", path))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration used when no file is given: one simulated destination
    /// seeded with demo data
    pub fn demo() -> Self {
        let mut destinations = BTreeMap::new();
        destinations.insert(
            DEFAULT_DESTINATION.to_string(),
            DestinationEntry {
                settings: DestinationConfig::default(),
                connector: ConnectorConfig::default(),
            },
        );
        Self {
            destinations,
            ..Default::default()
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !self.destinations.contains_key(&self.backend.destination) {
            bail!(
                "backend.destination '{}' is not defined under [destinations]",
                self.backend.destination
            );
        }
        if self.backend.user_delete_function.trim().is_empty() {
            bail!("backend.user_delete_function must not be empty");
        }
        Ok(())
    }

    /// Build a destination (with its own pool) for every configured entry
    pub fn build_registry(&self) -> DestinationRegistry {
        let mut registry = DestinationRegistry::new();
        for (name, entry) in &self.destinations {
            let connector: Arc<dyn Connector> = match &entry.connector {
                ConnectorConfig::Simulated(sim) => {
                    tracing::info!(
                        destination = %name,
                        latency_ms = sim.latency_ms,
                        seed_demo_data = sim.seed_demo_data,
                        "Using simulated backend"
                    );
                    Arc::new(SimulatedConnector::from_config(sim.clone()))
                }
            };
            registry.register(Destination::new(
                name.clone(),
                entry.settings.clone(),
                connector,
            ));
        }
        registry
    }
}
