//! Callback interfaces implemented by star users.

// ============================================================================
// Imports
// ============================================================================

use bytes::Bytes;

use crate::error::Error;

use super::Status;

// ============================================================================
// Return Codes
// ============================================================================

/// Integer code for an accepted frame or an admitted send.
pub const SUCCESS: i32 = 0;

/// Integer code for a rejected frame or a refused send.
pub const FAILURE: i32 = -1;

// ============================================================================
// StarDelegate
// ============================================================================

/// Callbacks a star invokes from its link task.
///
/// Only [`on_receive`](StarDelegate::on_receive) is required. The other two
/// default to no-ops.
///
/// Callbacks for one star never run concurrently with each other, and none
/// fire for a session after `terminate` has returned. A callback may call
/// back into the star (for example, relaunch from `on_connection_status_changed`).
pub trait StarDelegate: Send + Sync {
    /// One inbound frame.
    ///
    /// Return [`SUCCESS`] when the frame was handled and [`FAILURE`] to reject
    /// it. Rejections are logged; delivery is not retried.
    fn on_receive(&self, data: Bytes) -> i32;

    /// A status transition was committed.
    fn on_connection_status_changed(&self, _status: Status) {}

    /// A send issued with this delegate as its handler concluded.
    ///
    /// `error` is `None` on success, a transport error if the write failed
    /// or the link dropped, and [`Error::Cancelled`] after `terminate`.
    fn on_finish_send(&self, _payload: &Bytes, _error: Option<&Error>) {}
}

// ============================================================================
// IpHints
// ============================================================================

/// Source of candidate IP addresses for a host, in fallback order.
///
/// Implemented by [`NetworkEventRouter`](crate::NetworkEventRouter). The star
/// only reads hints, never writes them.
pub trait IpHints: Send + Sync {
    /// Returns the known IPs for `host`, or `None` if the host is unknown.
    fn ip_list(&self, host: &str) -> Option<Vec<String>>;
}
