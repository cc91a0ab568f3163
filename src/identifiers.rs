//! Type-safe identifiers.
//!
//! Newtype wrappers keep send ids and observer ids from being mixed up.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

// ============================================================================
// SendId
// ============================================================================

/// Identifies one admitted send until its outcome is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SendId(Uuid);

impl SendId {
    /// Generates a new random send id.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for SendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ObserverId
// ============================================================================

static NEXT_OBSERVER_ID: AtomicU64 = AtomicU64::new(1);

/// Handle returned by `add_observer`, used to remove the observer again.
///
/// Ids increase monotonically, so sorting by id gives registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Allocates the next observer id.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_OBSERVER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
