//! The recurring reconcile cycle.
//!
//! Each cycle runs catalog apply, then the action trigger, then the
//! self-test, in that order. An error in any step ends the cycle early, is
//! logged at the loop boundary, and never stops the loop; the daemon
//! self-throttles purely through the fixed inter-cycle delay.

use std::time::Duration;

use steward_store::{DynResourceStore, StoreError};
use steward_transport::TransportError;
use tracing::{debug, error, info};

use crate::actions::ActionTrigger;
use crate::catalog::Catalog;
use crate::selftest::SelfTestRunner;
use crate::shutdown::Shutdown;

/// Everything that can end a cycle early. Matched (not blanket-caught) at
/// the loop boundary.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
}

pub struct Reconciler {
    catalog: Catalog,
    store: DynResourceStore,
    trigger: ActionTrigger,
    self_test: SelfTestRunner,
    interval: Duration,
}

impl Reconciler {
    pub fn new(
        catalog: Catalog,
        store: DynResourceStore,
        trigger: ActionTrigger,
        self_test: SelfTestRunner,
        interval: Duration,
    ) -> Self {
        Self {
            catalog,
            store,
            trigger,
            self_test,
            interval,
        }
    }

    /// One full pass: apply the catalog, fire the bootstrap action, run the
    /// self-test.
    pub async fn run_cycle(&self) -> Result<(), CycleError> {
        self.catalog.apply(self.store.as_ref()).await?;
        self.trigger.fire().await?;
        self.self_test.run().await?;
        Ok(())
    }

    /// Run cycles until `shutdown` fires. No cycle error ever escapes.
    pub async fn run(self, shutdown: Shutdown) {
        info!(interval = ?self.interval, "reconcile loop started");
        while !shutdown.is_triggered() {
            match self.run_cycle().await {
                Ok(()) => debug!("reconcile cycle complete"),
                Err(CycleError::Store(err)) => {
                    error!(error = %err, "reconcile cycle aborted on a store failure");
                }
                Err(CycleError::Transport(err)) => {
                    error!(error = %err, "reconcile cycle aborted on a transport failure");
                }
            }

            // The sleep is the only preemptable point; racing it against the
            // shutdown signal just makes shutdown prompt.
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.wait() => break,
            }
        }
        info!("reconcile loop stopped");
    }
}
