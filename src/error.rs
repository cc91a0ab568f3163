//! Error types for stargate.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! Fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use stargate::{Error, Result, Star};
//!
//! fn push(star: &Star, payload: Vec<u8>) -> Result<()> {
//!     let id = star.try_send(payload)?;
//!     tracing::debug!(%id, "queued");
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidArgument`] |
//! | Admission | [`Error::NotConnected`], [`Error::TooManyPendingSends`] |
//! | Transport | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] |
//! | Protocol | [`Error::Protocol`], [`Error::UnknownCommand`] |
//! | Cancellation | [`Error::Cancelled`] |
//! | External | [`Error::Json`], [`Error::Url`], [`Error::WebSocket`] |
//!
//! Admission errors are returned synchronously. Transport and cancellation
//! errors only ever travel through delegate callbacks. Protocol errors stay
//! inside the router: the frame is logged and dropped.

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::star::Status;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when a [`Star`](crate::Star) cannot be built.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Invalid argument in launch options or registration.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // Admission Errors
    // ========================================================================
    /// Send attempted while the star is not connected.
    #[error("Not connected (status: {status})")]
    NotConnected {
        /// Status observed by the admission check.
        status: Status,
    },

    /// Too many sends are awaiting completion.
    #[error("Too many pending sends: {limit}")]
    TooManyPendingSends {
        /// Configured limit.
        limit: usize,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Connection failed or broke mid-flight.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Dialing a candidate address timed out.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Remote end closed the link.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Malformed frame.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// No controller or push receiver for the command id.
    #[error("Unknown command: {cmd_id}")]
    UnknownCommand {
        /// The unrouted command id.
        cmd_id: u32,
    },

    // ========================================================================
    // Cancellation
    // ========================================================================
    /// Pending operation cancelled by `terminate`.
    #[error("Cancelled")]
    Cancelled,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON error while reading launch options.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid endpoint URL.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a not connected error.
    #[inline]
    pub fn not_connected(status: Status) -> Self {
        Self::NotConnected { status }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an unknown command error.
    #[inline]
    pub fn unknown_command(cmd_id: u32) -> Self {
        Self::UnknownCommand { cmd_id }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if a send was refused by the admission check.
    #[inline]
    #[must_use]
    pub fn is_admission_error(&self) -> bool {
        matches!(
            self,
            Self::NotConnected { .. } | Self::TooManyPendingSends { .. }
        )
    }

    /// Returns `true` if this is a transport error.
    #[inline]
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this is a protocol error.
    #[inline]
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Self::Protocol { .. } | Self::UnknownCommand { .. })
    }

    /// Returns `true` if the operation was cancelled by `terminate`.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Transport failures leave the star in `Error`, which a later
    /// `launch` recovers from.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        self.is_transport_error() || self.is_admission_error()
    }
}

// ============================================================================
// Tests
// ============================================================================
