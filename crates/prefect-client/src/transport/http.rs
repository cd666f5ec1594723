//! `reqwest` implementation of the transport

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use super::{Endpoint, Transport, TransportError};
use crate::config::ClientConfig;

/// HTTP transport against the vendor service
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    /// Build a transport from configuration
    ///
    /// The static service credential is installed as a default
    /// `Authorization: Bearer <key>` header alongside the JSON headers, so no
    /// request can leave without it.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let mut bearer =
            HeaderValue::from_str(&format!("Bearer {}", config.service_credential)).map_err(
                |e| TransportError::InvalidConfig(format!("Invalid service credential: {}", e)),
            )?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeouts.request_ms))
            .connect_timeout(Duration::from_millis(config.timeouts.connect_ms))
            .default_headers(headers)
            .build()?;

        // A trailing slash keeps `join` from dropping the last path segment
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| TransportError::InvalidConfig(format!("Invalid base URL: {}", e)))?;

        Ok(Self { client, base_url })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full URL of an endpoint
    pub fn url(&self, endpoint: Endpoint) -> Result<Url, TransportError> {
        self.base_url
            .join(endpoint.path())
            .map_err(|e| TransportError::InvalidConfig(e.to_string()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, endpoint: Endpoint, payload: &Value) -> Result<Value, TransportError> {
        let url = self.url(endpoint)?;
        debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        let status = response.status();
        let text = response.text().await.map_err(TransportError::from_reqwest)?;
        trace!(status = status.as_u16(), bytes = text.len(), "Vendor response");

        // The vendor sends JSON error bodies with non-2xx statuses; those are
        // still API answers and go back to the session for interpretation.
        match serde_json::from_str::<Value>(&text) {
            Ok(body) => Ok(body),
            Err(_) if !status.is_success() => Err(TransportError::Status {
                status: status.as_u16(),
                body: text,
            }),
            Err(e) => Err(TransportError::InvalidBody(format!("{}: {}", e, text))),
        }
    }
}
