//! Test utilities for prefect-client
//!
//! [`FakeVendor`] emulates the four vendor endpoints over real HTTP, and
//! [`TestServer`] serves it on a loopback port so tests can drive the full
//! [`HttpTransport`](crate::HttpTransport) stack.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::config::ClientConfig;
use crate::transport::Endpoint;
use crate::{Result, Session};

/// Token handed out by the fake login endpoint
pub const FAKE_AUTH_TOKEN: &str = "fake-session-token";

/// A request received by the fake vendor
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub endpoint: Endpoint,
    /// Body's `PARAMS` object (`Null` if absent or not JSON)
    pub params: Value,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub accept: Option<String>,
}

impl ReceivedRequest {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key)?.as_str()
    }
}

/// A command as the fake server executed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedCommand {
    /// Server-side active vehicle when the command arrived
    pub vin: Option<String>,
    pub lookup_code: String,
}

/// Scripted reply for an endpoint
#[derive(Debug, Clone)]
pub enum FakeReply {
    Json(StatusCode, Value),
    Text(StatusCode, String),
}

#[derive(Default)]
struct FakeVendorInner {
    journal: Mutex<Vec<ReceivedRequest>>,
    replies: Mutex<HashMap<Endpoint, FakeReply>>,
    active_vehicle: Mutex<Option<String>>,
    executed: Mutex<Vec<ExecutedCommand>>,
    delay: Mutex<Option<Duration>>,
}

/// In-memory stand-in for the vendor service
///
/// Keeps a single server-side active vehicle, like the real service, and
/// logs which vehicle each command actually landed on.
#[derive(Clone, Default)]
pub struct FakeVendor {
    inner: Arc<FakeVendorInner>,
}

impl FakeVendor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the reply for an endpoint
    pub fn reply(&self, endpoint: Endpoint, reply: FakeReply) {
        self.inner.replies.lock().insert(endpoint, reply);
    }

    /// Override the reply for an endpoint with a 200 JSON body
    pub fn reply_json(&self, endpoint: Endpoint, body: Value) {
        self.reply(endpoint, FakeReply::Json(StatusCode::OK, body));
    }

    /// Delay every reply, to widen interleaving windows
    pub fn set_delay(&self, delay: Duration) {
        *self.inner.delay.lock() = Some(delay);
    }

    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.inner.journal.lock().clone()
    }

    pub fn executed_commands(&self) -> Vec<ExecutedCommand> {
        self.inner.executed.lock().clone()
    }

    pub fn active_vehicle(&self) -> Option<String> {
        self.inner.active_vehicle.lock().clone()
    }

    /// Router serving the vendor endpoints under `/services/`
    pub fn router(&self) -> Router {
        Router::new()
            .route("/services/{name}", post(handle_request))
            .with_state(self.clone())
    }

    fn default_reply(endpoint: Endpoint) -> Value {
        match endpoint {
            Endpoint::Login => json!({"response": {"authToken": FAKE_AUTH_TOKEN}}),
            Endpoint::EnergyReport => json!({"response": []}),
            Endpoint::SetActiveVehicle => json!({"status": "200 OK"}),
            Endpoint::AddCommand => json!({"status": "200 OK", "jobId": "fake-job"}),
        }
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

async fn handle_request(
    State(vendor): State<FakeVendor>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let Some(endpoint) = Endpoint::from_path(&format!("services/{}", name)) else {
        return (StatusCode::NOT_FOUND, "unknown service").into_response();
    };

    let params = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("PARAMS").cloned())
        .unwrap_or(Value::Null);

    let request = ReceivedRequest {
        endpoint,
        params,
        authorization: header(&headers, "authorization"),
        content_type: header(&headers, "content-type"),
        accept: header(&headers, "accept"),
    };
    vendor.inner.journal.lock().push(request.clone());

    let delay = *vendor.inner.delay.lock();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let reply = vendor
        .inner
        .replies
        .lock()
        .get(&endpoint)
        .cloned()
        .unwrap_or_else(|| FakeReply::Json(StatusCode::OK, FakeVendor::default_reply(endpoint)));

    let accepted = matches!(&reply, FakeReply::Json(status, body)
        if status.is_success() && body.get("error").is_none());
    if accepted {
        match endpoint {
            Endpoint::SetActiveVehicle => {
                *vendor.inner.active_vehicle.lock() = request.param("VIN").map(str::to_owned);
            }
            Endpoint::AddCommand => {
                let vin = vendor.inner.active_vehicle.lock().clone();
                vendor.inner.executed.lock().push(ExecutedCommand {
                    vin,
                    lookup_code: request.param("LOOKUPCODE").unwrap_or_default().to_string(),
                });
            }
            _ => {}
        }
    }

    match reply {
        FakeReply::Json(status, body) => (status, Json(body)).into_response(),
        FakeReply::Text(status, text) => (status, text).into_response(),
    }
}

/// A test server that automatically shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Serve an axum Router on an ephemeral loopback port
    ///
    /// # Example
    ///
    /// ```ignore
    /// use prefect_client::testing::{FakeVendor, TestServer};
    ///
    /// let vendor = FakeVendor::new();
    /// let server = TestServer::start(vendor.router()).await?;
    /// let session = server.session("service-key")?;
    /// session.login("driver@example.com", "pw").await?;
    /// ```
    pub async fn start(router: Router) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Get the base URL of the test server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client configuration pointing at this server with short timeouts
    pub fn config(&self, service_credential: &str) -> ClientConfig {
        ClientConfig::new(service_credential)
            .with_base_url(self.base_url())
            .with_timeouts(5_000, 2_000)
    }

    /// HTTP session against this server
    pub fn session(&self, service_credential: &str) -> Result<Arc<Session>> {
        Ok(Arc::new(Session::new(&self.config(service_credential))?))
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_base_url_format() {
        let server = TestServer::start(FakeVendor::new().router()).await.unwrap();
        assert_eq!(server.base_url(), format!("http://127.0.0.1:{}", server.addr.port()));
        assert_eq!(server.config("k").base_url, server.base_url());
    }

    #[test]
    fn test_default_replies() {
        assert_eq!(
            FakeVendor::default_reply(Endpoint::Login)["response"]["authToken"],
            FAKE_AUTH_TOKEN
        );
        assert!(FakeVendor::default_reply(Endpoint::EnergyReport)["response"].is_array());
    }
}
