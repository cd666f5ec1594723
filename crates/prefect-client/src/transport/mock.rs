//! Mock transport for testing
//!
//! Records every request in arrival order and answers from scripted replies:
//! queued one-shot replies first, then a per-endpoint default.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use super::{Endpoint, Transport, TransportError};

/// Token returned by the default login reply
pub const MOCK_AUTH_TOKEN: &str = "mock-session-token";

/// One request seen by the mock
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub endpoint: Endpoint,
    pub payload: Value,
}

impl RecordedCall {
    /// Value of a `PARAMS` field, as a string
    pub fn param(&self, key: &str) -> Option<&str> {
        self.payload.get("PARAMS")?.get(key)?.as_str()
    }
}

enum Reply {
    Body(Value),
    Failure(String),
}

/// Scripted, recording transport
pub struct MockTransport {
    calls: Mutex<Vec<RecordedCall>>,
    queued: Mutex<HashMap<Endpoint, VecDeque<Reply>>>,
    defaults: Mutex<HashMap<Endpoint, Value>>,
    delay: Option<Duration>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            queued: Mutex::new(HashMap::new()),
            defaults: Mutex::new(Self::default_responses()),
            delay: None,
        }
    }

    /// Sleep this long inside every call, to widen interleaving windows
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Replace the standing reply for an endpoint
    pub fn respond(&self, endpoint: Endpoint, body: Value) {
        self.defaults.lock().insert(endpoint, body);
    }

    /// Queue a one-shot reply, used before the standing reply
    pub fn enqueue(&self, endpoint: Endpoint, body: Value) {
        self.queued
            .lock()
            .entry(endpoint)
            .or_default()
            .push_back(Reply::Body(body));
    }

    /// Queue a one-shot connection failure
    pub fn enqueue_failure(&self, endpoint: Endpoint, message: impl Into<String>) {
        self.queued
            .lock()
            .entry(endpoint)
            .or_default()
            .push_back(Reply::Failure(message.into()));
    }

    /// All calls so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Endpoints hit so far, in order
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.calls.lock().iter().map(|c| c.endpoint).collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn default_responses() -> HashMap<Endpoint, Value> {
        HashMap::from([
            (
                Endpoint::Login,
                json!({"response": {"authToken": MOCK_AUTH_TOKEN}}),
            ),
            (Endpoint::EnergyReport, json!({"response": []})),
            (Endpoint::SetActiveVehicle, json!({"status": "200 OK"})),
            (
                Endpoint::AddCommand,
                json!({"status": "200 OK", "jobId": "mock-job"}),
            ),
        ])
    }

    fn next_reply(&self, endpoint: Endpoint) -> Reply {
        if let Some(reply) = self
            .queued
            .lock()
            .get_mut(&endpoint)
            .and_then(|queue| queue.pop_front())
        {
            return reply;
        }
        Reply::Body(
            self.defaults
                .lock()
                .get(&endpoint)
                .cloned()
                .unwrap_or(Value::Null),
        )
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post(&self, endpoint: Endpoint, payload: &Value) -> Result<Value, TransportError> {
        self.calls.lock().push(RecordedCall {
            endpoint,
            payload: payload.clone(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.next_reply(endpoint) {
            Reply::Body(body) => Ok(body),
            Reply::Failure(message) => Err(TransportError::ConnectionFailed(message)),
        }
    }
}
