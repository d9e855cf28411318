//! Entity resource gateway over the platform message bus.
//!
//! One abstract capability (store a resource under an entity name, read it
//! back) with two interchangeable wire shapes behind it: the two-hop
//! content-address + pointer-collection store ([`ContentStore`]) and the
//! single-hop `/entity/`-namespaced combined store ([`CombinedStore`]).
//! Which one is deployed is a configuration decision, not code.

mod combined;
mod content;

pub use combined::{CombinedStore, ENTITY_PREFIX, KV_GET_TOPIC, KV_PUT_TOPIC};
pub use content::{
    CAS_GET_TOPIC, CAS_STORE_TOPIC, ContentStore, POINTER_GET_TOPIC, POINTER_STORE_TOPIC,
};

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use steward_transport::{DynTransport, TransportError};

pub type DynResourceStore = Arc<dyn ResourceStore>;

/// Data accepted for storage: raw bytes pass through unchanged, structured
/// values are canonicalized to JSON bytes before transmission.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Bytes(Vec<u8>),
    Json(serde_json::Value),
}

impl Payload {
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, StoreError> {
        match self {
            Payload::Bytes(bytes) => Ok(bytes.clone()),
            Payload::Json(value) => serde_json::to_vec(value).map_err(StoreError::Serialize),
        }
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::Json(value)
    }
}

/// Idempotent store/read access to entity resources.
///
/// Calls issue one or two bus requests and never retry; retrying is the
/// reconcile loop's job on its next cycle.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Store `payload` under `entity`. Re-storing the same pair leaves the
    /// store in the same observable state.
    async fn store_resource(&self, entity: &str, payload: &Payload) -> Result<(), StoreError>;

    /// Read the bytes last stored under `entity`, or `None` if the entity
    /// was never stored. Absence is a value, not an error.
    async fn get_resource(&self, entity: &str) -> Result<Option<Vec<u8>>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("entity name must not be empty")]
    EmptyEntity,
    #[error("content store returned an empty handle for '{entity}'")]
    EmptyHandle { entity: String },
    #[error("store rejected the write for '{entity}'")]
    Rejected { entity: String },
    #[error("payload cannot be canonicalized: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Which wire shape the deployed store speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    #[default]
    ContentAddressed,
    Combined,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cas" | "content-addressed" => Ok(StoreBackend::ContentAddressed),
            "combined" => Ok(StoreBackend::Combined),
            other => Err(format!(
                "unknown store backend '{other}' (expected 'cas' or 'combined')"
            )),
        }
    }
}

/// Open the gateway matching the configured backend.
pub fn open(backend: StoreBackend, transport: DynTransport) -> DynResourceStore {
    match backend {
        StoreBackend::ContentAddressed => Arc::new(ContentStore::new(transport)),
        StoreBackend::Combined => Arc::new(CombinedStore::new(transport)),
    }
}

pub(crate) fn ensure_entity(entity: &str) -> Result<(), StoreError> {
    if entity.is_empty() {
        return Err(StoreError::EmptyEntity);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_payloads_pass_through_unchanged() {
        let payload = Payload::Bytes(vec![0, 159, 146, 150]);
        assert_eq!(payload.canonical_bytes().unwrap(), vec![0, 159, 146, 150]);
    }

    #[test]
    fn json_payloads_canonicalize() {
        let payload = Payload::Json(serde_json::json!({"kind": "watcher"}));
        assert_eq!(
            payload.canonical_bytes().unwrap(),
            br#"{"kind":"watcher"}"#.to_vec()
        );
    }

    #[test]
    fn backend_parses_both_variants() {
        assert_eq!(
            "cas".parse::<StoreBackend>().unwrap(),
            StoreBackend::ContentAddressed
        );
        assert_eq!(
            "combined".parse::<StoreBackend>().unwrap(),
            StoreBackend::Combined
        );
        assert!("redis".parse::<StoreBackend>().is_err());
    }
}
