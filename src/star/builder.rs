//! Builder pattern for star configuration.
//!
//! Provides a fluent API for configuring and creating [`Star`] instances.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use stargate::{NetworkEventRouter, Star};
//!
//! # async fn example() -> stargate::Result<()> {
//! let router = Arc::new(NetworkEventRouter::new());
//!
//! let star = Star::builder()
//!     .server("im.example.com", 8081)
//!     .delegate(router.clone())
//!     .ip_hints(router)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use crate::error::{Error, Result};
use crate::transport::{Dialer, WebSocketDialer};

use super::core::{Star, StarConfig};
use super::delegate::{IpHints, StarDelegate};

// ============================================================================
// Constants
// ============================================================================

/// Default per-candidate connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default limit on sends awaiting completion.
pub const DEFAULT_MAX_PENDING_SENDS: usize = 1024;

// ============================================================================
// StarBuilder
// ============================================================================

/// Builder for configuring a [`Star`] instance.
///
/// Use [`Star::builder()`] to create a new builder.
#[derive(Clone)]
pub struct StarBuilder {
    /// Server host name.
    host: Option<String>,
    /// Server port.
    port: u16,
    /// Receiver of inbound frames and status changes.
    delegate: Option<Arc<dyn StarDelegate>>,
    /// Candidate IP source.
    ip_hints: Option<Arc<dyn IpHints>>,
    /// Link dialer.
    dialer: Option<Arc<dyn Dialer>>,
    /// Per-candidate connect timeout.
    connect_timeout: Duration,
    /// Limit on sends awaiting completion.
    max_pending_sends: usize,
    /// Runtime the link task runs on.
    runtime: Option<Handle>,
}

impl Default for StarBuilder {
    fn default() -> Self {
        Self {
            host: None,
            port: 0,
            delegate: None,
            ip_hints: None,
            dialer: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_pending_sends: DEFAULT_MAX_PENDING_SENDS,
            runtime: None,
        }
    }
}

impl fmt::Debug for StarBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StarBuilder")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("has_delegate", &self.delegate.is_some())
            .field("has_ip_hints", &self.ip_hints.is_some())
            .field("connect_timeout", &self.connect_timeout)
            .field("max_pending_sends", &self.max_pending_sends)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// StarBuilder Implementation
// ============================================================================

impl StarBuilder {
    /// Creates a new builder with default timeouts and no server.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server host and port.
    ///
    /// Launch options may override either per launch.
    #[inline]
    #[must_use]
    pub fn server(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = Some(host.into());
        self.port = port;
        self
    }

    /// Sets the delegate that receives frames and status changes.
    #[inline]
    #[must_use]
    pub fn delegate(mut self, delegate: Arc<dyn StarDelegate>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    /// Sets the source of candidate IPs for the server host.
    #[inline]
    #[must_use]
    pub fn ip_hints(mut self, hints: Arc<dyn IpHints>) -> Self {
        self.ip_hints = Some(hints);
        self
    }

    /// Replaces the default [`WebSocketDialer`].
    #[inline]
    #[must_use]
    pub fn dialer(mut self, dialer: Arc<dyn Dialer>) -> Self {
        self.dialer = Some(dialer);
        self
    }

    /// Sets the per-candidate connect timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the limit on sends awaiting completion.
    #[inline]
    #[must_use]
    pub fn max_pending_sends(mut self, limit: usize) -> Self {
        self.max_pending_sends = limit;
        self
    }

    /// Sets the runtime link tasks are spawned on.
    ///
    /// Defaults to the runtime `build` is called from.
    #[inline]
    #[must_use]
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Builds the star with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if host, port or delegate are missing or invalid
    /// - [`Error::Config`] if no runtime was set and `build` runs outside one
    pub fn build(self) -> Result<Star> {
        let host = self.validate_host()?;
        self.validate_limits()?;

        let delegate = self.delegate.clone().ok_or_else(|| {
            Error::config("A delegate is required. Use .delegate() to set it.")
        })?;

        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|e| {
                Error::config(format!(
                    "No tokio runtime available ({e}). Call build() inside a runtime or use .runtime()."
                ))
            })?,
        };

        Ok(Star::new(StarConfig {
            host,
            port: self.port,
            delegate,
            ip_hints: self.ip_hints,
            dialer: self
                .dialer
                .unwrap_or_else(|| Arc::new(WebSocketDialer::default())),
            connect_timeout: self.connect_timeout,
            max_pending_sends: self.max_pending_sends,
            runtime,
        }))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl StarBuilder {
    /// Validates the server configuration.
    fn validate_host(&self) -> Result<String> {
        let host = self.host.clone().ok_or_else(|| {
            Error::config(
                "Server address is required. Use .server() to set it.\n\
                 Example: Star::builder().server(\"im.example.com\", 8081)",
            )
        })?;

        if host.trim().is_empty() {
            return Err(Error::config("Server host must not be empty"));
        }

        if self.port == 0 {
            return Err(Error::config("Server port must be non-zero"));
        }

        Ok(host)
    }

    /// Validates timeouts and limits.
    fn validate_limits(&self) -> Result<()> {
        if self.connect_timeout.is_zero() {
            return Err(Error::config("Connect timeout must be non-zero"));
        }

        if self.max_pending_sends == 0 {
            return Err(Error::config("max_pending_sends must be at least 1"));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
