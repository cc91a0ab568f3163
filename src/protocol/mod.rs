//! Wire framing.
//!
//! Star itself only moves byte buffers. The router needs just enough
//! structure to read a command id, which this module provides.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `frame` | Command-id prefixed frames |

// ============================================================================
// Submodules
// ============================================================================

/// Command-id prefixed frames.
pub mod frame;

// ============================================================================
// Re-exports
// ============================================================================

pub use frame::{CMD_ID_LEN, Frame, peek_cmd_id};
