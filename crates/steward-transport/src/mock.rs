//! Mock bus for testing.
//!
//! [`MockBus`] routes each topic to a registered handler and records every
//! request it sees, so tests can assert on exact wire payloads. A topic with
//! no handler behaves like a bus with no responder: the request times out.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::{Transport, TransportError};

type Handler = Box<dyn Fn(&[u8]) -> Result<Vec<u8>, TransportError> + Send + Sync>;

#[derive(Default)]
pub struct MockBus {
    handlers: Mutex<HashMap<String, Handler>>,
    requests: Mutex<Vec<(String, Vec<u8>)>>,
    draining: AtomicBool,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `topic`, replacing any previous one.
    pub fn handle<F>(&self, topic: impl Into<String>, handler: F)
    where
        F: Fn(&[u8]) -> Result<Vec<u8>, TransportError> + Send + Sync + 'static,
    {
        self.handlers
            .lock()
            .unwrap()
            .insert(topic.into(), Box::new(handler));
    }

    /// Register a handler that always replies with the same bytes.
    pub fn reply_with(&self, topic: impl Into<String>, reply: impl Into<Vec<u8>>) {
        let reply = reply.into();
        self.handle(topic, move |_| Ok(reply.clone()));
    }

    /// Every request seen so far, in order.
    pub fn requests(&self) -> Vec<(String, Vec<u8>)> {
        self.requests.lock().unwrap().clone()
    }

    /// Payloads of the requests sent to `topic`, in order.
    pub fn requests_to(&self, topic: &str) -> Vec<Vec<u8>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for MockBus {
    async fn request(&self, topic: &str, payload: &[u8]) -> Result<Vec<u8>, TransportError> {
        if self.draining.load(Ordering::Acquire) {
            return Err(TransportError::Draining {
                topic: topic.to_string(),
            });
        }
        self.requests
            .lock()
            .unwrap()
            .push((topic.to_string(), payload.to_vec()));
        let handlers = self.handlers.lock().unwrap();
        match handlers.get(topic) {
            Some(handler) => handler(payload),
            None => Err(TransportError::Timeout {
                topic: topic.to_string(),
                timeout: Duration::from_secs(3),
            }),
        }
    }

    async fn drain(&self) {
        self.draining.store(true, Ordering::Release);
    }
}
