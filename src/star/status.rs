//! Connection status.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// Status
// ============================================================================

/// Connection status of a [`Star`](crate::Star).
///
/// ```text
///            launch            handshake
///   Init ───────────► Connecting ───────► Connected
///    ▲                 │    ▲                │
///    │ terminate       │    │ launch         │ I/O failure
///    │ (from any)      ▼    │                ▼
///    └──────────────  Error ◄────────────────┘
/// ```
///
/// `Error` is not terminal: a later `launch` moves back to `Connecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    /// Not launched, or terminated.
    #[default]
    Init,
    /// Dialing candidates.
    Connecting,
    /// Link established; sends are admitted.
    Connected,
    /// Dial or I/O failure; waiting for the application to relaunch.
    Error,
}

impl Status {
    /// Returns `true` if sends are admitted.
    #[inline]
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns `true` if `launch` would start a new attempt.
    #[inline]
    #[must_use]
    pub const fn is_launchable(self) -> bool {
        matches!(self, Self::Init | Self::Error)
    }

    /// Returns `true` if `self → next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Init, Self::Init) => false,
            (_, Self::Init) => true,
            (Self::Init | Self::Error, Self::Connecting) => true,
            (Self::Connecting, Self::Connected) => true,
            (Self::Connecting | Self::Connected, Self::Error) => true,
            _ => false,
        }
    }

    /// Returns the lowercase name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
