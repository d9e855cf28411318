//! Two-hop gateway: content-addressable blob store plus pointer collection.
//!
//! A write stores the bytes in the CAS to obtain a content handle, then
//! records an `entity -> handle` assignment in the pointer collection. A
//! read resolves the pointer first and fetches the blob behind it.

use async_trait::async_trait;
use steward_transport::DynTransport;

use crate::{Payload, ResourceStore, StoreError, ensure_entity};

pub const CAS_STORE_TOPIC: &str = "conthesis.cas.store";
pub const CAS_GET_TOPIC: &str = "conthesis.cas.get";
pub const POINTER_STORE_TOPIC: &str = "conthesis.dcollect.store";
pub const POINTER_GET_TOPIC: &str = "conthesis.dcollect.get";

/// Reply sentinel for a rejected pointer write.
const ERR_REPLY: &[u8] = b"ERR";

pub struct ContentStore {
    transport: DynTransport,
}

impl ContentStore {
    pub fn new(transport: DynTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ResourceStore for ContentStore {
    async fn store_resource(&self, entity: &str, payload: &Payload) -> Result<(), StoreError> {
        ensure_entity(entity)?;
        let data = payload.canonical_bytes()?;

        let handle = self.transport.request(CAS_STORE_TOPIC, &data).await?;
        if handle.is_empty() {
            return Err(StoreError::EmptyHandle {
                entity: entity.to_string(),
            });
        }

        let mut assignment = Vec::with_capacity(entity.len() + 1 + handle.len());
        assignment.extend_from_slice(entity.as_bytes());
        assignment.push(b'\n');
        assignment.extend_from_slice(&handle);

        let ack = self
            .transport
            .request(POINTER_STORE_TOPIC, &assignment)
            .await?;
        if ack == ERR_REPLY {
            return Err(StoreError::Rejected {
                entity: entity.to_string(),
            });
        }
        Ok(())
    }

    async fn get_resource(&self, entity: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let handle = self
            .transport
            .request(POINTER_GET_TOPIC, entity.as_bytes())
            .await?;
        if handle.is_empty() {
            // No pointer recorded for this entity.
            return Ok(None);
        }
        let bytes = self.transport.request(CAS_GET_TOPIC, &handle).await?;
        Ok(Some(bytes))
    }
}
