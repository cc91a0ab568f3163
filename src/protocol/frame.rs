//! Command-id framed byte buffers.
//!
//! Every frame on the wire starts with a 4-byte big-endian command id,
//! followed by an opaque payload the router hands to application code.
//!
//! ```text
//! ┌──────────────┬─────────────────────────────┐
//! │ cmd_id (u32) │ payload (0..n bytes)        │
//! └──────────────┴─────────────────────────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Width of the leading command-id field in bytes.
pub const CMD_ID_LEN: usize = 4;

// ============================================================================
// Frame
// ============================================================================

/// One decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Routing tag.
    pub cmd_id: u32,
    /// Bytes after the command id.
    pub payload: Bytes,
}

impl Frame {
    /// Creates a frame.
    #[inline]
    #[must_use]
    pub fn new(cmd_id: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            cmd_id,
            payload: payload.into(),
        }
    }

    /// Encodes the frame for [`Star::send`](crate::Star::send).
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(CMD_ID_LEN + self.payload.len());
        buf.put_u32(self.cmd_id);
        buf.extend_from_slice(&self.payload);
        buf.freeze()
    }

    /// Decodes a frame without copying the payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if `data` is shorter than the command-id
    /// field.
    pub fn decode(data: &Bytes) -> Result<Self> {
        let cmd_id = peek_cmd_id(data).ok_or_else(|| {
            Error::protocol(format!(
                "frame too short: {} bytes, need {CMD_ID_LEN}",
                data.len()
            ))
        })?;

        Ok(Self {
            cmd_id,
            payload: data.slice(CMD_ID_LEN..),
        })
    }
}

/// Reads the command id without decoding the rest of the frame.
#[inline]
#[must_use]
pub fn peek_cmd_id(data: &[u8]) -> Option<u32> {
    if data.len() < CMD_ID_LEN {
        return None;
    }
    Some((&data[..CMD_ID_LEN]).get_u32())
}

// ============================================================================
// Tests
// ============================================================================
