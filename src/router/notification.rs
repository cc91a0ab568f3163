//! In-process publish/subscribe for connectivity changes.
//!
//! Observers join with [`NotificationCenter::add_observer`] and leave with
//! [`NotificationCenter::remove_observer`]. Publication snapshots the
//! observer list first, so joining or leaving mid-publication (even from an
//! observer callback) never affects the notification already in flight.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::identifiers::ObserverId;
use crate::star::Status;

// ============================================================================
// Constants
// ============================================================================

/// Name of the notification posted on every star status transition.
pub const CONNECTION_STATUS_CHANGED: &str = "stargate.connectionStatusChanged";

// ============================================================================
// Types
// ============================================================================

/// Observer callback.
pub type Observer = Arc<dyn Fn(&Notification) + Send + Sync>;

/// One posted notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    /// Notification name.
    pub name: &'static str,
    /// New connection status.
    pub status: Status,
}

impl Notification {
    /// Creates a [`CONNECTION_STATUS_CHANGED`] notification.
    #[inline]
    #[must_use]
    pub const fn connection_status_changed(status: Status) -> Self {
        Self {
            name: CONNECTION_STATUS_CHANGED,
            status,
        }
    }
}

// ============================================================================
// NotificationCenter
// ============================================================================

/// Ordered set of observers.
#[derive(Default)]
pub struct NotificationCenter {
    observers: RwLock<Vec<(ObserverId, Observer)>>,
}

impl fmt::Debug for NotificationCenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationCenter")
            .field("observer_count", &self.observer_count())
            .finish()
    }
}

impl NotificationCenter {
    /// Creates an empty center.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an observer. Observers are called in registration order.
    pub fn add_observer(&self, observer: Observer) -> ObserverId {
        let id = ObserverId::next();
        self.observers.write().push((id, observer));
        trace!(%id, "Observer added");
        id
    }

    /// Removes an observer. Returns `false` if it was not registered.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(observer_id, _)| *observer_id != id);
        before != observers.len()
    }

    /// Delivers `notification` to every current observer.
    ///
    /// Returns the number of observers notified.
    pub fn post(&self, notification: &Notification) -> usize {
        let snapshot: Vec<Observer> = self
            .observers
            .read()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        trace!(
            name = notification.name,
            status = %notification.status,
            observers = snapshot.len(),
            "Posting notification"
        );

        for observer in &snapshot {
            observer(notification);
        }
        snapshot.len()
    }

    /// Returns the number of observers.
    #[inline]
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }
}

// ============================================================================
// Tests
// ============================================================================
