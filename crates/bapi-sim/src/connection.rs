//! Connector and connection of the simulated system

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bapi_core::{
    Connection, Connector, DestinationConfig, FunctionCall, FunctionResponse, FunctionSignature,
    Message, ParameterKind, RfcError, RfcResult, COMMIT_FUNCTION, RETURN_PARAMETER,
    ROLLBACK_FUNCTION,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::functions::{self, returning};
use crate::signatures;
use crate::system::{Change, Script, SimulatedSystem};

/// Simulated connector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Simulated latency per remote call in milliseconds
    #[serde(default)]
    pub latency_ms: u64,
    /// Start with demo partners, users and flights
    #[serde(default = "default_seed")]
    pub seed_demo_data: bool,
    /// Journal every executed call (grows without bound)
    #[serde(default)]
    pub journal: bool,
}

fn default_seed() -> bool {
    true
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            latency_ms: 0,
            seed_demo_data: default_seed(),
            journal: false,
        }
    }
}

/// Opens connections to a [`SimulatedSystem`]
pub struct SimulatedConnector {
    system: Arc<SimulatedSystem>,
    config: SimConfig,
    next_id: AtomicU64,
}

impl SimulatedConnector {
    pub fn new(system: Arc<SimulatedSystem>, config: SimConfig) -> Self {
        Self {
            system,
            config,
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a fresh system as described by `config`
    pub fn from_config(config: SimConfig) -> Self {
        let system = if config.seed_demo_data {
            SimulatedSystem::with_demo_data()
        } else {
            SimulatedSystem::new()
        };
        system.set_journaling(config.journal);
        Self::new(Arc::new(system), config)
    }

    /// The backing system, for inspection and fault injection
    pub fn system(&self) -> &Arc<SimulatedSystem> {
        &self.system
    }
}

#[async_trait]
impl Connector for SimulatedConnector {
    async fn connect(&self, config: &DestinationConfig) -> RfcResult<Box<dyn Connection>> {
        if self.system.is_unreachable() {
            return Err(RfcError::Connection(format!(
                "partner {} not reached",
                config.host
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(
            connection = id,
            host = %config.host,
            client = %config.client,
            "Simulated connection opened"
        );
        Ok(Box::new(SimulatedConnection {
            id,
            system: self.system.clone(),
            latency: Duration::from_millis(self.config.latency_ms),
            pending: Vec::new(),
        }))
    }
}

/// One backend context with its own logical unit of work
struct SimulatedConnection {
    id: u64,
    system: Arc<SimulatedSystem>,
    latency: Duration,
    pending: Vec<Change>,
}

impl SimulatedConnection {
    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn ensure_reachable(&self) -> RfcResult<()> {
        if self.system.is_unreachable() {
            return Err(RfcError::Connection(format!(
                "connection {} closed by partner",
                self.id
            )));
        }
        Ok(())
    }

    fn commit(&mut self) -> FunctionResponse {
        let changes = std::mem::take(&mut self.pending);
        debug!(connection = self.id, changes = changes.len(), "Simulated commit");
        self.system.apply(changes);
        FunctionResponse::default()
    }

    fn rollback(&mut self) -> FunctionResponse {
        debug!(connection = self.id, discarded = self.pending.len(), "Simulated rollback");
        self.pending.clear();
        FunctionResponse::default()
    }
}

/// Deliver scripted messages through the function's own `RETURN` parameter
fn scripted(function: &str, messages: Vec<Message>) -> FunctionResponse {
    let as_structure = signatures::lookup(function).is_some_and(|sig| {
        sig.parameter(RETURN_PARAMETER)
            .is_some_and(|param| matches!(param.kind, ParameterKind::Structure(_)))
    });

    if as_structure {
        let mut response = FunctionResponse::default();
        if let Some(first) = messages.first() {
            response
                .structures
                .insert(RETURN_PARAMETER.to_string(), first.to_return_row());
        }
        response
    } else {
        returning(messages)
    }
}

#[async_trait]
impl Connection for SimulatedConnection {
    async fn lookup(&mut self, function: &str) -> RfcResult<FunctionSignature> {
        self.delay().await;
        self.ensure_reachable()?;
        signatures::lookup(function)
            .ok_or_else(|| RfcError::mismatch(function, "function not found in repository"))
    }

    async fn execute(&mut self, call: &FunctionCall) -> RfcResult<FunctionResponse> {
        self.delay().await;
        self.system.record(call);
        self.ensure_reachable()?;

        let function = call.name();
        match self.system.take_script(function) {
            Some(Script::Messages(messages)) => return Ok(scripted(function, messages)),
            Some(Script::RuntimeError(text)) => return Err(RfcError::RemoteRuntime(text)),
            Some(Script::Disconnect) => {
                self.pending.clear();
                return Err(RfcError::Connection(format!(
                    "connection {} lost during {}",
                    self.id, function
                )));
            }
            None => {}
        }

        match function {
            COMMIT_FUNCTION => Ok(self.commit()),
            ROLLBACK_FUNCTION => Ok(self.rollback()),
            _ => functions::execute(&self.system, &mut self.pending, call),
        }
    }
}

impl Drop for SimulatedConnection {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            warn!(
                connection = self.id,
                discarded = self.pending.len(),
                "Simulated connection closed with uncommitted changes"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use bapi_core::{FieldSet, Severity};

    use super::*;
    use crate::signatures::{BP_CREATE, USER_GET_DETAIL};

    fn connector() -> SimulatedConnector {
        SimulatedConnector::from_config(SimConfig {
            latency_ms: 0,
            seed_demo_data: false,
            journal: true,
        })
    }

    fn create_acme() -> FunctionCall {
        FunctionCall::new(BP_CREATE)
            .structure("HEADERDATA", FieldSet::new().with("COMPANY_NAME", "Acme"))
    }

    #[test]
    fn test_sim_config_defaults() {
        let config: SimConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.latency_ms, 0);
        assert!(config.seed_demo_data);
        assert!(!config.journal);
    }

    #[tokio::test]
    async fn test_journal_is_off_by_default() {
        let connector = SimulatedConnector::from_config(SimConfig::default());
        let mut conn = connector
            .connect(&DestinationConfig::default())
            .await
            .unwrap();

        for _ in 0..50 {
            conn.execute(&FunctionCall::new(USER_GET_DETAIL).scalar("USERNAME", "DEVELOPER"))
                .await
                .unwrap();
        }
        conn.execute(&create_acme()).await.unwrap();
        conn.execute(&FunctionCall::new(COMMIT_FUNCTION)).await.unwrap();

        assert!(!connector.system().is_journaling());
        assert!(connector.system().journal().is_empty());
        assert_eq!(connector.system().calls_to(BP_CREATE), 0);
    }

    #[tokio::test]
    async fn test_changes_visible_only_after_commit() {
        let connector = connector();
        let config = DestinationConfig::default();
        let mut conn = connector.connect(&config).await.unwrap();

        conn.execute(&create_acme()).await.unwrap();
        assert_eq!(connector.system().partner_count(), 0);

        conn.execute(&FunctionCall::new(COMMIT_FUNCTION)).await.unwrap();
        assert!(connector.system().partner("0100000000").is_some());
    }

    #[tokio::test]
    async fn test_rollback_discards_but_number_range_advances() {
        let connector = connector();
        let config = DestinationConfig::default();
        let mut conn = connector.connect(&config).await.unwrap();

        conn.execute(&create_acme()).await.unwrap();
        conn.execute(&FunctionCall::new(ROLLBACK_FUNCTION)).await.unwrap();
        assert_eq!(connector.system().partner_count(), 0);

        let response = conn.execute(&create_acme()).await.unwrap();
        assert_eq!(
            response.exports.text("BUSINESSPARTNERID").as_deref(),
            Some("0100000001")
        );
    }

    #[tokio::test]
    async fn test_luw_is_per_connection() {
        let connector = connector();
        let config = DestinationConfig::default();
        let mut first = connector.connect(&config).await.unwrap();
        let mut second = connector.connect(&config).await.unwrap();

        first.execute(&create_acme()).await.unwrap();
        second
            .execute(&FunctionCall::new(COMMIT_FUNCTION))
            .await
            .unwrap();
        assert_eq!(connector.system().partner_count(), 0);

        drop(first);
        assert_eq!(connector.system().partner_count(), 0);
    }

    #[tokio::test]
    async fn test_scripts_and_journal() {
        let connector = connector();
        let system = connector.system().clone();
        let mut conn = connector
            .connect(&DestinationConfig::default())
            .await
            .unwrap();

        system.script(
            COMMIT_FUNCTION,
            Script::Messages(vec![Message::new(
                Severity::Abort,
                "BAPI",
                "001",
                "update terminated",
            )]),
        );
        let response = conn.execute(&FunctionCall::new(COMMIT_FUNCTION)).await.unwrap();
        assert_eq!(
            response.structures[RETURN_PARAMETER].text("TYPE").as_deref(),
            Some("A")
        );

        system.script(USER_GET_DETAIL, Script::RuntimeError("SYSTEM_FAILURE".into()));
        let err = conn
            .execute(&FunctionCall::new(USER_GET_DETAIL))
            .await
            .unwrap_err();
        assert!(matches!(err, RfcError::RemoteRuntime(_)));

        system.script(BP_CREATE, Script::Disconnect);
        let err = conn.execute(&create_acme()).await.unwrap_err();
        assert!(matches!(err, RfcError::Connection(_)));

        assert_eq!(
            system.journal_names(),
            vec![COMMIT_FUNCTION, USER_GET_DETAIL, BP_CREATE]
        );
        assert_eq!(system.calls_to(BP_CREATE), 1);
    }

    #[tokio::test]
    async fn test_unreachable() {
        let connector = connector();
        connector.system().set_unreachable(true);
        let result = connector.connect(&DestinationConfig::default()).await;
        assert!(matches!(result, Err(RfcError::Connection(_))));
    }
}
