//! Single-hop gateway: one key/value store keyed by the `/entity/` namespace.
//!
//! No content handles here; the value travels in the write request itself
//! and the read returns it directly.

use async_trait::async_trait;
use steward_transport::DynTransport;

use crate::{Payload, ResourceStore, StoreError, ensure_entity};

pub const KV_PUT_TOPIC: &str = "conthesis.kv.put";
pub const KV_GET_TOPIC: &str = "conthesis.kv.get";

/// Key namespace reserved for entity resources.
pub const ENTITY_PREFIX: &str = "/entity/";

const ERR_REPLY: &[u8] = b"ERR";

pub struct CombinedStore {
    transport: DynTransport,
}

impl CombinedStore {
    pub fn new(transport: DynTransport) -> Self {
        Self { transport }
    }

    fn key(entity: &str) -> Vec<u8> {
        let mut key = Vec::with_capacity(ENTITY_PREFIX.len() + entity.len());
        key.extend_from_slice(ENTITY_PREFIX.as_bytes());
        key.extend_from_slice(entity.as_bytes());
        key
    }
}

#[async_trait]
impl ResourceStore for CombinedStore {
    async fn store_resource(&self, entity: &str, payload: &Payload) -> Result<(), StoreError> {
        ensure_entity(entity)?;
        let data = payload.canonical_bytes()?;

        let mut request = Self::key(entity);
        request.push(b'\n');
        request.extend_from_slice(&data);

        let ack = self.transport.request(KV_PUT_TOPIC, &request).await?;
        if ack == ERR_REPLY {
            return Err(StoreError::Rejected {
                entity: entity.to_string(),
            });
        }
        Ok(())
    }

    async fn get_resource(&self, entity: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let bytes = self
            .transport
            .request(KV_GET_TOPIC, &Self::key(entity))
            .await?;
        // An empty reply means no value under the key; the store holds no
        // empty entries.
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(bytes))
    }
}
