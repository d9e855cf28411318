//! Request/reply transport boundary for the Conthesis message bus.
//!
//! Everything the daemon sends goes through the [`Transport`] trait: one
//! topic-addressed request, one byte-sequence reply, bounded by a timeout.
//! [`HttpTransport`] talks to the real bus gateway; [`MockBus`] serves tests.

mod http;
pub mod mock;

pub use http::{HttpTransport, HttpTransportConfig};
pub use mock::MockBus;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

pub type DynTransport = Arc<dyn Transport>;

/// Topic-addressed request/reply client over the platform message bus.
///
/// The bus connection is shared and multiplexed by the implementation;
/// callers issue concurrent requests without extra locking.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `payload` to `topic` and wait for the reply bytes.
    async fn request(&self, topic: &str, payload: &[u8]) -> Result<Vec<u8>, TransportError>;

    /// Finish in-flight requests and reject new ones from now on.
    async fn drain(&self);
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request to '{topic}' timed out after {timeout:?}")]
    Timeout { topic: String, timeout: Duration },
    #[error("request to '{topic}' failed: {source}")]
    Http {
        topic: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to '{topic}' answered with status {status}")]
    Status { topic: String, status: u16 },
    #[error("transport is draining, request to '{topic}' rejected")]
    Draining { topic: String },
    #[error("invalid bus endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("bus endpoint '{endpoint}' is unreachable: {source}")]
    Unreachable {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
}
