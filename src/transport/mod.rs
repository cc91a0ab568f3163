//! Link transport layer.
//!
//! This module owns everything between a [`Star`](crate::Star) and the
//! socket: dialing candidates and running the per-launch event loop.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   LinkCommand   ┌──────────────┐   frames   ┌────────┐
//! │  Star (any      │ ──────────────► │  link task   │ ◄────────► │ server │
//! │  thread)        │ ◄────────────── │  (tokio)     │            │        │
//! └─────────────────┘   LinkObserver  └──────────────┘            └────────┘
//! ```
//!
//! # Link Lifecycle
//!
//! 1. `launch` spawns a link task with the candidate endpoints
//! 2. The task dials candidates in order through a [`Dialer`]
//! 3. The first [`Link`] that answers becomes the session's link
//! 4. Frames flow until the remote closes, I/O fails, or `terminate`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Link task and event loop |
//! | `dialer` | Dialer trait, endpoints, WebSocket dialer |

// ============================================================================
// Submodules
// ============================================================================

/// Link task and event loop.
pub(crate) mod connection;

/// Dialer trait and the WebSocket implementation.
pub mod dialer;

// ============================================================================
// Re-exports
// ============================================================================

pub use dialer::{Dialer, Endpoint, FrameSink, FrameStream, Link, WebSocketDialer};
