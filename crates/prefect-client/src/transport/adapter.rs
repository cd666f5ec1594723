//! Transport trait and endpoint table

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use super::TransportError;

/// Vendor endpoints consumed by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Login,
    /// Vehicle list with telemetry ("energy report")
    EnergyReport,
    SetActiveVehicle,
    AddCommand,
}

impl Endpoint {
    /// Path relative to the base URL
    pub fn path(&self) -> &'static str {
        match self {
            Self::Login => "services/webLoginPS",
            Self::EnergyReport => "services/webRemoteEnergyReportPS",
            Self::SetActiveVehicle => "services/webSetActiveVehiclePS",
            Self::AddCommand => "services/webAddCommandPS",
        }
    }

    /// Look up an endpoint from its path, with or without a leading `/`
    pub fn from_path(path: &str) -> Option<Self> {
        match path.trim_start_matches('/') {
            "services/webLoginPS" => Some(Self::Login),
            "services/webRemoteEnergyReportPS" => Some(Self::EnergyReport),
            "services/webSetActiveVehiclePS" => Some(Self::SetActiveVehicle),
            "services/webAddCommandPS" => Some(Self::AddCommand),
            _ => None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// JSON POST primitive shared by all session operations
///
/// Implementations attach the fixed header set (JSON content type, JSON
/// accept, static bearer credential) to every request and return the parsed
/// JSON body. Anything that prevents a JSON body from coming back is a
/// [`TransportError`]; interpreting the body is the session's job.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, endpoint: Endpoint, payload: &Value) -> Result<Value, TransportError>;
}
