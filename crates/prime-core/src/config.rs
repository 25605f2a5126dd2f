//! Configuration structures for Prime Infrastructure clients.
//!
//! This module provides the connection settings for a Prime Infrastructure server: address,
//! credentials, TLS behaviour, timeouts and the retry budget, with validation.

use crate::client::{DEFAULT_REQUEST_TIMEOUT, DEFAULT_RETRY_BUDGET};
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;
use validator::Validate;

/// Generation of the Prime Infrastructure REST API.
///
/// Prime 3.3 introduced `v3`; Prime 3.4 and later serve `v4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiVersion {
    /// API v3
    #[default]
    V3,
    /// API v4
    V4,
}

impl ApiVersion {
    /// Path component used in request URLs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::V3 => "v3",
            Self::V4 => "v4",
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a Prime Infrastructure connector.
///
/// Credentials and address are fixed for the lifetime of a client built from this configuration.
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct PrimeConfig {
    /// Server address (IPv4 address or hostname, optionally with port)
    #[validate(length(min = 1))]
    pub host: String,

    /// API user name
    #[validate(length(min = 1))]
    pub username: String,

    /// API user password
    #[serde(skip_serializing)]
    pub password: String,

    /// Skip TLS certificate verification.
    ///
    /// Prime servers commonly run with self-signed certificates. Enabling this accepts any
    /// certificate, which leaves the connection open to interception.
    #[serde(default)]
    pub accept_invalid_certs: bool,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Attempts granted to one logical request
    #[validate(range(min = 1, max = 10))]
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,

    /// REST API generation
    #[serde(default)]
    pub api_version: ApiVersion,
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT
}

const fn default_retry_budget() -> u32 {
    DEFAULT_RETRY_BUDGET
}

impl PrimeConfig {
    /// Create a new configuration with required parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, Error> {
        let config = Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            accept_invalid_certs: false,
            request_timeout_secs: default_request_timeout_secs(),
            retry_budget: default_retry_budget(),
            api_version: ApiVersion::default(),
        };

        config.ensure_valid()?;
        Ok(config)
    }

    /// Validate the configuration, reporting failures as [`Error::ConfigError`].
    ///
    /// # Errors
    ///
    /// Returns an error if any field is out of range.
    pub fn ensure_valid(&self) -> Result<(), Error> {
        self.validate()
            .map_err(|e| Error::ConfigError(format!("Invalid configuration: {e}")))
    }

    /// Accept invalid TLS certificates (self-signed, expired, wrong host).
    #[must_use]
    pub const fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Set request timeout in seconds.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Set the retry budget.
    #[must_use]
    pub const fn with_retry_budget(mut self, budget: u32) -> Self {
        self.retry_budget = budget;
        self
    }

    /// Set the REST API generation.
    #[must_use]
    pub const fn with_api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = version;
        self
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Base URL of the server, `https://{host}/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the host does not form a valid URL.
    pub fn base_url(&self) -> Result<Url, Error> {
        Url::parse(&format!("https://{}/", self.host))
            .map_err(|e| Error::ConfigError(format!("Invalid Prime host `{}`: {e}", self.host)))
    }
}

impl fmt::Debug for PrimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrimeConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("retry_budget", &self.retry_budget)
            .field("api_version", &self.api_version)
            .finish()
    }
}
