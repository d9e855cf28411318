//! HTTP client for the bus gateway.
//!
//! Topics map onto the gateway's request namespace: a call to topic `t`
//! becomes `POST {endpoint}/req/{t}` with the raw payload as body, and the
//! raw response body is the reply. The timeout is enforced twice, as a
//! client default and as a hard cap around the whole send.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tokio::sync::Notify;
use tokio::time::timeout;

use crate::{Transport, TransportError};

/// Configuration for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Base URL of the bus gateway.
    pub endpoint: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl HttpTransportConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(3),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Bus client over a single shared HTTP connection pool.
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    base: Url,
    timeout: Duration,
    draining: AtomicBool,
    in_flight: AtomicUsize,
    idle: Notify,
}

impl HttpTransport {
    /// Connect to the bus gateway and verify it is reachable.
    ///
    /// Any HTTP response to the probe counts as reachable; only a transport
    /// failure (refused connection, DNS) is fatal.
    pub async fn connect(config: HttpTransportConfig) -> Result<Self, TransportError> {
        let transport = Self::new(&config)?;
        transport
            .client
            .get(transport.base.clone())
            .send()
            .await
            .map_err(|source| TransportError::Unreachable {
                endpoint: config.endpoint.clone(),
                source,
            })?;
        Ok(transport)
    }

    fn new(config: &HttpTransportConfig) -> Result<Self, TransportError> {
        let base = Url::parse(&config.endpoint).map_err(|e| TransportError::InvalidEndpoint {
            endpoint: config.endpoint.clone(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(TransportError::InvalidEndpoint {
                endpoint: config.endpoint.clone(),
                reason: "endpoint must be an http(s) base URL".into(),
            });
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::InvalidEndpoint {
                endpoint: config.endpoint.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            client,
            base,
            timeout: config.timeout,
            draining: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            idle: Notify::new(),
        })
    }

    fn topic_url(&self, topic: &str) -> Result<Url, TransportError> {
        let mut url = self.base.clone();
        {
            let mut segments =
                url.path_segments_mut()
                    .map_err(|()| TransportError::InvalidEndpoint {
                        endpoint: self.base.to_string(),
                        reason: "endpoint cannot carry a path".into(),
                    })?;
            segments.pop_if_empty().push("req").push(topic);
        }
        Ok(url)
    }

    fn timeout_error(&self, topic: &str) -> TransportError {
        TransportError::Timeout {
            topic: topic.to_string(),
            timeout: self.timeout,
        }
    }
}

/// Tracks one outstanding request; wakes the drain waiter when the last
/// request finishes.
struct FlightGuard<'a> {
    transport: &'a HttpTransport,
}

impl<'a> FlightGuard<'a> {
    fn new(transport: &'a HttpTransport) -> Self {
        transport.in_flight.fetch_add(1, Ordering::AcqRel);
        Self { transport }
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if self.transport.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.transport.idle.notify_waiters();
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, topic: &str, payload: &[u8]) -> Result<Vec<u8>, TransportError> {
        if self.draining.load(Ordering::Acquire) {
            return Err(TransportError::Draining {
                topic: topic.to_string(),
            });
        }
        let _guard = FlightGuard::new(self);

        let url = self.topic_url(topic)?;
        let send = self.client.post(url).body(payload.to_vec()).send();
        let response = match timeout(self.timeout, send).await {
            Ok(Ok(r)) => r,
            Ok(Err(e)) if e.is_timeout() => return Err(self.timeout_error(topic)),
            Ok(Err(e)) => {
                return Err(TransportError::Http {
                    topic: topic.to_string(),
                    source: e,
                });
            }
            Err(_) => return Err(self.timeout_error(topic)),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                topic: topic.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Http {
                topic: topic.to_string(),
                source: e,
            })?;
        Ok(body.to_vec())
    }

    async fn drain(&self) {
        self.draining.store(true, Ordering::Release);
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // Register before checking the counter so the last in-flight
            // request cannot slip its wakeup between the check and the await.
            notified.as_mut().enable();
            if self.in_flight.load(Ordering::Acquire) == 0 {
                break;
            }
            notified.await;
        }
        tracing::debug!("transport drained");
    }
}
