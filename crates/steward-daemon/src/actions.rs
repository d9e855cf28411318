//! Bootstrap trigger for the external action engine.
//!
//! Re-storing the watcher entity does not by itself make the action engine
//! re-evaluate its watchers; the engine may have restarted and lost its
//! in-memory state. Firing the fixed bootstrap action after every catalog
//! apply keeps the watcher subscription durable.

use serde::Serialize;
use steward_transport::{DynTransport, TransportError};

use crate::catalog::UPDATE_WATCHER_ENTITY;

pub const TRIGGER_ACTION_TOPIC: &str = "conthesis.action.TriggerAction";

/// Message telling the action engine which entity's logic to run.
#[derive(Debug, Clone, Serialize)]
pub struct ActionDescriptor {
    pub meta: ActionMeta,
    pub action_source: String,
    pub action: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionMeta {
    pub updated_entity: String,
    pub bootstrap: bool,
}

impl ActionDescriptor {
    /// The one descriptor this daemon ever sends: bootstrap the catalog's
    /// watcher entity.
    pub fn bootstrap_watcher() -> Self {
        Self {
            meta: ActionMeta {
                updated_entity: UPDATE_WATCHER_ENTITY.into(),
                bootstrap: true,
            },
            action_source: "ENTITY".into(),
            action: UPDATE_WATCHER_ENTITY.into(),
        }
    }
}

/// Sends a pre-serialized descriptor and ignores the reply.
pub struct ActionTrigger {
    transport: DynTransport,
    descriptor: Vec<u8>,
}

impl ActionTrigger {
    pub fn new(transport: DynTransport, descriptor: &ActionDescriptor) -> Self {
        let descriptor = serde_json::to_vec(descriptor).expect("serialize action descriptor");
        Self {
            transport,
            descriptor,
        }
    }

    pub async fn fire(&self) -> Result<(), TransportError> {
        let _reply = self
            .transport
            .request(TRIGGER_ACTION_TOPIC, &self.descriptor)
            .await?;
        Ok(())
    }
}
