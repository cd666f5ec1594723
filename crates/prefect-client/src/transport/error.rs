//! Transport layer errors

use thiserror::Error;

/// Failures below the vendor API contract: the request never produced a
/// JSON document the session could interpret.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Non-2xx status whose body was not JSON
    #[error("Server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// 2xx status whose body was not JSON
    #[error("Response body is not JSON: {0}")]
    InvalidBody(String),

    #[error("Invalid transport configuration: {0}")]
    InvalidConfig(String),
}

impl TransportError {
    /// Classify a reqwest failure into timeout / connect / generic HTTP
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::ConnectionFailed(err.to_string())
        } else {
            Self::Http(err)
        }
    }
}
