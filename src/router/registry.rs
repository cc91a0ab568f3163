//! Controller and push-receiver registries.
//!
//! Both registries are key-unique maps behind their own `RwLock`. Handlers
//! are cloned out under the read lock and invoked after it is released, so a
//! handler may register or unregister others while it runs.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

// ============================================================================
// Controller
// ============================================================================

/// Application handler for frames of one command id.
///
/// Closures `Fn(u32, Bytes)` implement this trait.
pub trait Controller: Send + Sync {
    /// Handles the payload of a frame (command id already stripped).
    fn on_frame(&self, cmd_id: u32, payload: Bytes);
}

impl<F> Controller for F
where
    F: Fn(u32, Bytes) + Send + Sync,
{
    fn on_frame(&self, cmd_id: u32, payload: Bytes) {
        self(cmd_id, payload);
    }
}

// ============================================================================
// PushNotifyDelegate
// ============================================================================

/// Application receiver for out-of-band push frames.
///
/// Closures `Fn(Bytes, u32)` implement this trait.
pub trait PushNotifyDelegate: Send + Sync {
    /// Handles a push payload.
    fn notify_push_message(&self, data: Bytes, cmd_id: u32);
}

impl<F> PushNotifyDelegate for F
where
    F: Fn(Bytes, u32) + Send + Sync,
{
    fn notify_push_message(&self, data: Bytes, cmd_id: u32) {
        self(data, cmd_id);
    }
}

// ============================================================================
// ControllerRegistry
// ============================================================================

/// Command id → controller.
#[derive(Default)]
pub struct ControllerRegistry {
    controllers: RwLock<FxHashMap<u32, Arc<dyn Controller>>>,
}

impl fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<u32> = self.controllers.read().keys().copied().collect();
        ids.sort_unstable();
        f.debug_struct("ControllerRegistry")
            .field("cmd_ids", &ids)
            .finish()
    }
}

impl ControllerRegistry {
    /// Registers `controller`, returning the one it replaced.
    pub fn register(
        &self,
        cmd_id: u32,
        controller: Arc<dyn Controller>,
    ) -> Option<Arc<dyn Controller>> {
        let previous = self.controllers.write().insert(cmd_id, controller);
        debug!(cmd_id, replaced = previous.is_some(), "Controller registered");
        previous
    }

    /// Removes the controller for `cmd_id`.
    pub fn unregister(&self, cmd_id: u32) -> Option<Arc<dyn Controller>> {
        self.controllers.write().remove(&cmd_id)
    }

    /// Returns the controller for `cmd_id`.
    #[must_use]
    pub fn get(&self, cmd_id: u32) -> Option<Arc<dyn Controller>> {
        self.controllers.read().get(&cmd_id).cloned()
    }

    /// Returns the number of registered controllers.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.controllers.read().len()
    }

    /// Returns `true` if no controller is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.controllers.read().is_empty()
    }
}

// ============================================================================
// PushRegistry
// ============================================================================

/// One push registration: the command ids it claims and its receiver.
struct PushEntry {
    cmd_ids: FxHashSet<u32>,
    receiver: Arc<dyn PushNotifyDelegate>,
}

/// Registration key → push receiver.
///
/// Several receivers may claim the same command id under different keys;
/// each gets its own copy of the frame.
#[derive(Default)]
pub struct PushRegistry {
    entries: RwLock<FxHashMap<String, PushEntry>>,
}

impl fmt::Debug for PushRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self.entries.read().keys().cloned().collect();
        keys.sort_unstable();
        f.debug_struct("PushRegistry").field("keys", &keys).finish()
    }
}

impl PushRegistry {
    /// Registers `receiver` for `cmd_ids` under `key`, returning the receiver
    /// it replaced.
    pub fn register(
        &self,
        key: impl Into<String>,
        cmd_ids: impl IntoIterator<Item = u32>,
        receiver: Arc<dyn PushNotifyDelegate>,
    ) -> Option<Arc<dyn PushNotifyDelegate>> {
        let key = key.into();
        let entry = PushEntry {
            cmd_ids: cmd_ids.into_iter().collect(),
            receiver,
        };
        debug!(key = %key, cmd_ids = ?entry.cmd_ids, "Push receiver registered");

        self.entries
            .write()
            .insert(key, entry)
            .map(|previous| previous.receiver)
    }

    /// Removes the receiver under `key`.
    pub fn unregister(&self, key: &str) -> Option<Arc<dyn PushNotifyDelegate>> {
        self.entries.write().remove(key).map(|entry| entry.receiver)
    }

    /// Returns every receiver that claims `cmd_id`.
    #[must_use]
    pub fn matching(&self, cmd_id: u32) -> Vec<Arc<dyn PushNotifyDelegate>> {
        self.entries
            .read()
            .values()
            .filter(|entry| entry.cmd_ids.contains(&cmd_id))
            .map(|entry| Arc::clone(&entry.receiver))
            .collect()
    }

    /// Returns the number of registrations.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
