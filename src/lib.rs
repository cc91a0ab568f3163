//! stargate - persistent client transport with command-id routing.
//!
//! This library provides a reconnectable client connection ([`Star`]) and a
//! router ([`NetworkEventRouter`]) that demultiplexes inbound frames by
//! command id and keeps candidate IPs per host.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  launch / send   ┌──────────┐   link task   ┌────────┐
//! │ application  │ ───────────────► │   Star   │ ◄───────────► │ server │
//! └──────────────┘                  └──────────┘               └────────┘
//!        ▲                               │ StarDelegate
//!        │ controllers / push /          ▼
//!        │ status observers     ┌────────────────────┐
//!        └───────────────────── │ NetworkEventRouter │
//!                               └────────────────────┘
//! ```
//!
//! Key design principles:
//!
//! - One star, one link, one tokio task per launch
//! - `launch`, `terminate` and `send` never wait on the network
//! - Every send issued with a handler resolves exactly once
//! - Status changes follow a fixed set of edges and arrive in order
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use stargate::{Frame, NetworkEventRouter, Result, Star};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let router = Arc::new(NetworkEventRouter::new());
//!     router.set_ip_list(["10.0.0.2", "10.0.0.3"], "im.example.com");
//!     router.register_controller(
//!         1,
//!         Arc::new(|_cmd_id: u32, payload: Bytes| println!("{payload:?}")),
//!     );
//!
//!     let star = Star::builder()
//!         .server("im.example.com", 8081)
//!         .delegate(router.clone())
//!         .ip_hints(router.clone())
//!         .build()?;
//!
//!     star.launch(None);
//!     // ... after the connected notification:
//!     star.send(Frame::new(1, "hello").encode());
//!
//!     star.terminate();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`star`] | [`Star`], its builder, options, status and delegate traits |
//! | [`router`] | [`NetworkEventRouter`], registries, notifications |
//! | [`protocol`] | [`Frame`] codec |
//! | [`transport`] | [`Dialer`] trait and WebSocket dialer |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Command-id framing.
pub mod protocol;

/// Frame routing and IP bookkeeping.
pub mod router;

/// The star connection.
pub mod star;

/// Dialers and the link event loop.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Star types
pub use star::{
    FAILURE, IpHints, LaunchOptions, SUCCESS, Star, StarBuilder, StarDelegate, Status,
};

// Router types
pub use router::{
    CONNECTION_STATUS_CHANGED, Controller, Dispatch, NetworkEventRouter, Notification,
    NotificationCenter, PushNotifyDelegate,
};

// Protocol types
pub use protocol::Frame;

// Transport types
pub use transport::{Dialer, Endpoint, Link, WebSocketDialer};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ObserverId, SendId};
