//! Built-in system resources, re-applied to the store every cycle.
//!
//! The catalog is an immutable configuration value handed to the daemon at
//! construction; tests substitute their own. The one built-in entry is the
//! watcher definition the platform's entity watcher boots from.

use futures::future::try_join_all;
use serde::Serialize;
use steward_store::{Payload, ResourceStore, StoreError};

/// Entity holding the bootstrap watcher definition.
pub const UPDATE_WATCHER_ENTITY: &str = "_conthesis.watcher.UpdateWatcher";

/// Watcher configuration as the entity watcher consumes it.
#[derive(Debug, Clone, Serialize)]
pub struct WatcherSpec {
    pub kind: String,
    pub wildcard_triggers: Vec<String>,
    pub properties: Vec<PropertyBinding>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PropertyBinding {
    pub name: String,
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub entity: String,
    pub payload: Payload,
}

/// Fixed mapping of entity names to their declared desired content.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// The catalog baked into the process image.
    pub fn bootstrap() -> Self {
        let spec = WatcherSpec {
            kind: "entwatcher.UpdateWatchEntity".into(),
            wildcard_triggers: vec!["_conthesis.watcher".into()],
            properties: vec![
                PropertyBinding {
                    name: "name".into(),
                    kind: "META_FIELD".into(),
                    value: "updated_entity".into(),
                },
                PropertyBinding {
                    name: "entity".into(),
                    kind: "META_ENTITY".into(),
                    value: "updated_entity".into(),
                },
            ],
        };
        let payload = serde_json::to_value(&spec).expect("serialize built-in watcher spec");
        Self::new(vec![CatalogEntry {
            entity: UPDATE_WATCHER_ENTITY.into(),
            payload: Payload::Json(payload),
        }])
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Store every entry, fanned out concurrently. The first failure wins;
    /// there is no partial-success report.
    pub async fn apply(&self, store: &dyn ResourceStore) -> Result<(), StoreError> {
        try_join_all(
            self.entries
                .iter()
                .map(|entry| store.store_resource(&entry.entity, &entry.payload)),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use steward_store::{ContentStore, StoreBackend, open};
    use steward_transport::{MockBus, TransportError};

    use super::*;

    #[test]
    fn bootstrap_catalog_serializes_the_watcher_definition() {
        let catalog = Catalog::bootstrap();
        assert_eq!(catalog.entries().len(), 1);
        let entry = &catalog.entries()[0];
        assert_eq!(entry.entity, UPDATE_WATCHER_ENTITY);

        let bytes = entry.payload.canonical_bytes().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["kind"], "entwatcher.UpdateWatchEntity");
        assert_eq!(value["wildcard_triggers"][0], "_conthesis.watcher");
        assert_eq!(value["properties"][0]["kind"], "META_FIELD");
        assert_eq!(value["properties"][1]["kind"], "META_ENTITY");
    }

    #[tokio::test]
    async fn one_failing_entry_fails_the_whole_apply() {
        let bus = Arc::new(MockBus::new());
        bus.reply_with("conthesis.cas.store", b"h1".to_vec());
        bus.handle("conthesis.dcollect.store", |payload| {
            if payload.starts_with(b"bad\n") {
                Ok(b"ERR".to_vec())
            } else {
                Ok(b"OK".to_vec())
            }
        });
        let store = ContentStore::new(bus);

        let catalog = Catalog::new(vec![
            CatalogEntry {
                entity: "good".into(),
                payload: Payload::Bytes(b"a".to_vec()),
            },
            CatalogEntry {
                entity: "bad".into(),
                payload: Payload::Bytes(b"b".to_vec()),
            },
        ]);

        let err = catalog.apply(&store).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected { entity } if entity == "bad"));
    }

    #[tokio::test]
    async fn transport_failures_propagate_out_of_apply() {
        let bus = Arc::new(MockBus::new());
        // No handlers registered: every request times out.
        let store = open(StoreBackend::ContentAddressed, bus);

        let err = Catalog::bootstrap().apply(store.as_ref()).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Transport(TransportError::Timeout { .. })
        ));
    }
}
