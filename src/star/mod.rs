//! The star transport.
//!
//! A [`Star`] owns one logical connection: its status, the address it
//! reached, and byte-buffer send/receive. It knows nothing about command
//! semantics; inbound frames go straight to its [`StarDelegate`].
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | [`StarBuilder`] and defaults |
//! | `core` | [`Star`] itself |
//! | `delegate` | [`StarDelegate`] and [`IpHints`] |
//! | `options` | [`LaunchOptions`] |
//! | `status` | [`Status`] state machine |

// ============================================================================
// Submodules
// ============================================================================

/// Builder and defaults.
pub mod builder;

/// The star connection.
pub mod core;

/// Callback interfaces.
pub mod delegate;

/// Per-launch overrides.
pub mod options;

/// Status state machine.
pub mod status;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_PENDING_SENDS, StarBuilder};
pub use self::core::Star;
pub use delegate::{FAILURE, IpHints, SUCCESS, StarDelegate};
pub use options::LaunchOptions;
pub use status::Status;
