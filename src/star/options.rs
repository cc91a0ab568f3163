//! Per-launch options.
//!
//! [`LaunchOptions`] overrides the builder defaults for one `launch` call. It
//! is usually parsed from the string→value mapping handed to
//! [`Star::launch`](crate::Star::launch):
//!
//! ```json
//! {
//!   "host": "im.example.com",
//!   "port": 8081,
//!   "ips": ["10.0.0.2", "10.0.0.3"],
//!   "connectTimeoutMs": 5000
//! }
//! ```
//!
//! Unknown keys are ignored so application launch mappings can be passed
//! through unchanged.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

// ============================================================================
// LaunchOptions
// ============================================================================

/// Overrides applied to a single launch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LaunchOptions {
    /// Server host name.
    pub host: Option<String>,

    /// Server port.
    pub port: Option<u16>,

    /// Extra candidate IPs, dialed before router hints.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ips: Vec<String>,

    /// Per-candidate connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
}

// ============================================================================
// LaunchOptions - Constructors
// ============================================================================

impl LaunchOptions {
    /// Creates empty options (builder defaults apply).
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses options from a launch mapping.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if a known key has the wrong type.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        Ok(serde_json::from_value(Value::Object(map.clone()))?)
    }
}

// ============================================================================
// LaunchOptions - Builder Methods
// ============================================================================

impl LaunchOptions {
    /// Overrides the server host.
    #[inline]
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Overrides the server port.
    #[inline]
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Adds a candidate IP.
    #[inline]
    #[must_use]
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ips.push(ip.into());
        self
    }

    /// Overrides the connect timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }
}

// ============================================================================
// LaunchOptions - Accessors
// ============================================================================

impl LaunchOptions {
    /// Returns the connect timeout override.
    #[inline]
    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an empty host, port 0, an empty
    /// IP, or a zero timeout.
    pub fn validate(&self) -> Result<()> {
        if let Some(host) = &self.host
            && host.trim().is_empty()
        {
            return Err(Error::invalid_argument("host must not be empty"));
        }

        if self.port == Some(0) {
            return Err(Error::invalid_argument("port must be non-zero"));
        }

        if self.ips.iter().any(|ip| ip.trim().is_empty()) {
            return Err(Error::invalid_argument("candidate IPs must not be empty"));
        }

        if self.connect_timeout_ms == Some(0) {
            return Err(Error::invalid_argument("connect timeout must be non-zero"));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
