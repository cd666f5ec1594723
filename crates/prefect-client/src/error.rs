//! Error types for vendor API operations

use serde_json::Value;
use thiserror::Error;

use crate::transport::TransportError;

/// Result type alias for session and vehicle operations
pub type Result<T> = std::result::Result<T, PrefectError>;

/// Errors surfaced by [`Session`](crate::Session) and [`Vehicle`](crate::Vehicle)
///
/// Every variant describing a server reply carries the raw JSON body so the
/// caller can inspect what the vendor actually sent.
#[derive(Error, Debug)]
pub enum PrefectError {
    /// No usable username/password from any source
    #[error("Credentials missing: {0}")]
    CredentialsMissing(String),

    /// Login reply lacked `response.authToken`
    #[error("Authentication failed: {body}")]
    AuthenticationFailed { body: Value },

    /// A session-scoped call was attempted before a successful login
    #[error("Session is not authenticated")]
    NotAuthenticated,

    /// Vehicle listing reply had an unexpected shape
    #[error("Request failed: {body}")]
    RequestFailed { body: Value },

    /// Server answered with an `error` field
    #[error("Command rejected: {body}")]
    CommandRejected { body: Value },

    /// Server answered with a 400-class `status`
    #[error("Command failed: {body}")]
    CommandFailed { body: Value },

    /// Refresh found no vehicle with this VIN on the account
    #[error("Vehicle not found: {0}")]
    VehicleNotFound(String),

    /// Network, timeout or non-JSON failure below the API contract
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl PrefectError {
    /// Raw server payload carried by this error, if any
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::AuthenticationFailed { body }
            | Self::RequestFailed { body }
            | Self::CommandRejected { body }
            | Self::CommandFailed { body } => Some(body),
            _ => None,
        }
    }

    /// Whether this failure happened in the transport rather than the API contract
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
