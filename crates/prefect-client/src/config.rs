//! Client configuration and credential sources
//!
//! Configuration and credential files may be YAML, TOML or JSON; the format
//! is chosen by file extension.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Base URL of the production vendor service
pub const DEFAULT_BASE_URL: &str = "https://www.myfordmobile.com";

/// File name looked up in the user's config directory by [`CredentialSource::DefaultFile`]
pub const DEFAULT_CREDENTIALS_FILE: &str = "myfordmobile.json";

/// Session client configuration
///
/// The service credential is the static key the vendor's gateway expects as
/// `Authorization: Bearer <key>` on every call. It is independent of the
/// per-account session token obtained by logging in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    pub service_credential: String,

    #[serde(default)]
    pub timeouts: TimeoutsConfig,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Timeout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    /// General request timeout in milliseconds (default: 30s)
    #[serde(default = "default_request_timeout")]
    pub request_ms: u64,

    /// Connect timeout in milliseconds (default: 10s)
    #[serde(default = "default_connect_timeout")]
    pub connect_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            request_ms: default_request_timeout(),
            connect_ms: default_connect_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    30_000
}

fn default_connect_timeout() -> u64 {
    10_000
}

impl ClientConfig {
    /// Configuration for the production service with the given static key
    pub fn new(service_credential: impl Into<String>) -> Self {
        Self {
            base_url: default_base_url(),
            service_credential: service_credential.into(),
            timeouts: TimeoutsConfig::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeouts(mut self, request_ms: u64, connect_ms: u64) -> Self {
        self.timeouts = TimeoutsConfig {
            request_ms,
            connect_ms,
        };
        self
    }

    /// Load configuration from a YAML, TOML or JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load_file(path.as_ref())
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// Account credentials for the login endpoint
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.username.trim().is_empty() {
            return Err(ConfigError::MissingField("username"));
        }
        if self.password.is_empty() {
            return Err(ConfigError::MissingField("password"));
        }
        Ok(self)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where [`Session::authenticate`](crate::Session::authenticate) gets its credentials
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Username and password supplied directly
    Explicit(Credentials),
    /// A config file holding `username` and `password`
    File(PathBuf),
    /// `myfordmobile.json` in the user's config directory
    DefaultFile,
}

impl CredentialSource {
    pub fn explicit(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Explicit(Credentials::new(username, password))
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// Path of the default credentials file, if the platform has a config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(DEFAULT_CREDENTIALS_FILE))
    }

    /// Resolve to a validated username/password pair
    pub fn resolve(&self) -> Result<Credentials, ConfigError> {
        match self {
            Self::Explicit(creds) => creds.clone().validate(),
            Self::File(path) => load_credentials(path),
            Self::DefaultFile => {
                let path = Self::default_path().ok_or(ConfigError::NoConfigDir)?;
                load_credentials(&path)
            }
        }
    }
}

impl From<Credentials> for CredentialSource {
    fn from(creds: Credentials) -> Self {
        Self::Explicit(creds)
    }
}

/// Credential file contents; fields are optional so a missing one reports
/// which field is absent instead of a generic parse error.
#[derive(Deserialize)]
struct CredentialsFile {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

fn load_credentials(path: &Path) -> Result<Credentials, ConfigError> {
    let file: CredentialsFile = load_file(path)?;
    let username = file.username.ok_or(ConfigError::MissingField("username"))?;
    let password = file.password.ok_or(ConfigError::MissingField("password"))?;
    Credentials { username, password }.validate()
}

fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
        }
        Some("toml") => toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string())),
        _ => serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string())),
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Missing or empty field: {0}")]
    MissingField(&'static str),

    #[error("No user config directory on this platform")]
    NoConfigDir,
}
