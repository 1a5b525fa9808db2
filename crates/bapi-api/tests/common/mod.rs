//! Shared setup for HTTP integration tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bapi_api::{create_router, AppState};
use bapi_core::{Destination, DestinationConfig, DestinationRegistry};
use bapi_sim::{SimConfig, SimulatedConnector, SimulatedSystem};
use tokio::net::TcpListener;

pub const DESTINATION: &str = "SAP_DEST";

/// A test server that automatically shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    /// The simulated backend behind the server
    pub system: Arc<SimulatedSystem>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Serve a demo-seeded simulated backend under [`DESTINATION`]
    pub async fn start() -> Self {
        Self::start_with(DestinationConfig::default(), |state| state).await
    }

    /// Serve with a custom destination config and state adjustments
    pub async fn start_with(
        config: DestinationConfig,
        customize: impl FnOnce(AppState) -> AppState,
    ) -> Self {
        Self::start_with_backend(SimConfig::default(), config, customize).await
    }

    /// Serve with custom simulator settings (latency) as well
    pub async fn start_with_backend(
        sim: SimConfig,
        config: DestinationConfig,
        customize: impl FnOnce(AppState) -> AppState,
    ) -> Self {
        let system = Arc::new(SimulatedSystem::with_demo_data().with_journal());
        let connector = SimulatedConnector::new(system.clone(), sim);

        let mut registry = DestinationRegistry::new();
        registry.register(Destination::new(DESTINATION, config, Arc::new(connector)));
        let state = customize(AppState::new(Arc::new(registry), DESTINATION));

        // Bind to any available port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let router = create_router(state);

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        // Give server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        Self {
            addr,
            client,
            system,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
