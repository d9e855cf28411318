//! Process lifecycle: connect the transport, run the loop, drain on
//! shutdown.

use std::sync::Arc;

use steward_transport::{DynTransport, HttpTransport, HttpTransportConfig, TransportError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::info;

use crate::actions::{ActionDescriptor, ActionTrigger};
use crate::catalog::Catalog;
use crate::config::{ConfigError, DaemonConfig};
use crate::reconciler::Reconciler;
use crate::selftest::SelfTestRunner;
use crate::shutdown::Shutdown;

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
}

pub struct Daemon {
    transport: DynTransport,
    shutdown: Shutdown,
    loop_task: Mutex<Option<JoinHandle<()>>>,
}

impl Daemon {
    /// Connect to the bus and start the reconcile loop. Fails (fatally, for
    /// the caller) if the bus endpoint cannot be reached.
    pub async fn connect(config: DaemonConfig) -> Result<Self, DaemonError> {
        let transport = HttpTransport::connect(
            HttpTransportConfig::new(config.bus_url.clone()).with_timeout(config.request_timeout),
        )
        .await?;
        Ok(Self::start(config, Arc::new(transport)))
    }

    /// Start the reconcile loop over an already-connected transport.
    pub fn start(config: DaemonConfig, transport: DynTransport) -> Self {
        let store = steward_store::open(config.backend, transport.clone());
        let reconciler = Reconciler::new(
            Catalog::bootstrap(),
            store.clone(),
            ActionTrigger::new(transport.clone(), &ActionDescriptor::bootstrap_watcher()),
            SelfTestRunner::new(store),
            config.cycle_interval,
        );

        let shutdown = Shutdown::new();
        let loop_task = tokio::spawn(reconciler.run(shutdown.clone()));
        Self {
            transport,
            shutdown,
            loop_task: Mutex::new(Some(loop_task)),
        }
    }

    /// Block until shutdown has completed. Safe to call from any number of
    /// tasks.
    pub async fn wait(&self) {
        self.shutdown.wait().await;
    }

    /// Drain the transport, then complete the shutdown signal regardless of
    /// the drain outcome, then join the loop. Idempotent.
    pub async fn shutdown(&self) {
        info!("shutting down");
        self.transport.drain().await;
        self.shutdown.trigger();
        if let Some(task) = self.loop_task.lock().await.take() {
            let _ = task.await;
        }
    }
}
