//! Command-id router sitting behind a star.
//!
//! [`NetworkEventRouter`] is the usual [`StarDelegate`]: it reads the command
//! id of each inbound frame and hands the payload to a controller or to the
//! push receivers that claim it. It also republishes status changes through
//! its [`NotificationCenter`] and serves as the star's [`IpHints`].
//!
//! # Dispatch Order
//!
//! 1. A controller registered for the command id (exactly one delivery)
//! 2. Otherwise every push receiver whose pattern contains the command id
//! 3. Otherwise the frame is dropped and `on_receive` returns `-1`

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::protocol::Frame;
use crate::star::{FAILURE, IpHints, SUCCESS, StarDelegate, Status};

use super::ip_table::IpTable;
use super::notification::{Notification, NotificationCenter};
use super::registry::{Controller, ControllerRegistry, PushNotifyDelegate, PushRegistry};

// ============================================================================
// Dispatch
// ============================================================================

/// Where a frame went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Delivered to the controller for the command id.
    Controller,
    /// Delivered to this many push receivers.
    Push(usize),
}

// ============================================================================
// NetworkEventRouter
// ============================================================================

/// Routes frames by command id and keeps per-host IP candidates.
///
/// Each registry has its own lock; no two are ever held together, and none
/// is held while application code runs.
#[derive(Debug)]
pub struct NetworkEventRouter {
    /// Host → candidate IPs.
    ip_table: IpTable,
    /// Command id → controller.
    controllers: ControllerRegistry,
    /// Key → push receiver.
    push_receivers: PushRegistry,
    /// Status observers.
    notifications: Arc<NotificationCenter>,
}

impl Default for NetworkEventRouter {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// NetworkEventRouter - Constructor
// ============================================================================

impl NetworkEventRouter {
    /// Creates a router with its own notification center.
    #[must_use]
    pub fn new() -> Self {
        Self::with_notification_center(Arc::new(NotificationCenter::new()))
    }

    /// Creates a router posting to a shared notification center.
    #[must_use]
    pub fn with_notification_center(notifications: Arc<NotificationCenter>) -> Self {
        Self {
            ip_table: IpTable::new(),
            controllers: ControllerRegistry::default(),
            push_receivers: PushRegistry::default(),
            notifications,
        }
    }
}

// ============================================================================
// NetworkEventRouter - IP Lists
// ============================================================================

impl NetworkEventRouter {
    /// Replaces the candidate IPs for `host`.
    ///
    /// An empty list removes the host, so [`ip_list`](Self::ip_list) returns
    /// `None` for it rather than an empty list.
    pub fn set_ip_list<I, S>(&self, ips: I, host: &str)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ip_table.set_ip_list(ips, host);
    }

    /// Appends a candidate IP for `host`.
    pub fn add_ip_address(&self, ip: impl Into<String>, host: &str) {
        self.ip_table.add_ip_address(ip, host);
    }

    /// Returns the candidate IPs for `host`.
    #[must_use]
    pub fn ip_list(&self, host: &str) -> Option<Vec<String>> {
        self.ip_table.ip_list(host)
    }

    /// Forgets `host`.
    pub fn remove_host(&self, host: &str) -> Option<Vec<String>> {
        self.ip_table.remove_host(host)
    }
}

// ============================================================================
// NetworkEventRouter - Registration
// ============================================================================

impl NetworkEventRouter {
    /// Registers the controller for `cmd_id`, returning the one it replaced.
    pub fn register_controller(
        &self,
        cmd_id: u32,
        controller: Arc<dyn Controller>,
    ) -> Option<Arc<dyn Controller>> {
        self.controllers.register(cmd_id, controller)
    }

    /// Removes the controller for `cmd_id`.
    pub fn unregister_controller(&self, cmd_id: u32) -> Option<Arc<dyn Controller>> {
        self.controllers.unregister(cmd_id)
    }

    /// Registers a push receiver for `cmd_ids` under `key`.
    pub fn register_push_receiver(
        &self,
        key: impl Into<String>,
        cmd_ids: impl IntoIterator<Item = u32>,
        receiver: Arc<dyn PushNotifyDelegate>,
    ) -> Option<Arc<dyn PushNotifyDelegate>> {
        self.push_receivers.register(key, cmd_ids, receiver)
    }

    /// Removes the push receiver under `key`.
    pub fn unregister_push_receiver(&self, key: &str) -> Option<Arc<dyn PushNotifyDelegate>> {
        self.push_receivers.unregister(key)
    }

    /// Returns the notification center status changes are posted to.
    #[inline]
    #[must_use]
    pub fn notifications(&self) -> &Arc<NotificationCenter> {
        &self.notifications
    }
}

// ============================================================================
// NetworkEventRouter - Dispatch
// ============================================================================

impl NetworkEventRouter {
    /// Routes one frame.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if the frame is shorter than the command id
    /// - [`Error::UnknownCommand`] if nothing claims the command id
    pub fn dispatch(&self, data: &Bytes) -> Result<Dispatch> {
        let Frame { cmd_id, payload } = Frame::decode(data)?;

        if let Some(controller) = self.controllers.get(cmd_id) {
            trace!(cmd_id, len = payload.len(), "Dispatching to controller");
            controller.on_frame(cmd_id, payload);
            return Ok(Dispatch::Controller);
        }

        let receivers = self.push_receivers.matching(cmd_id);
        if receivers.is_empty() {
            return Err(Error::unknown_command(cmd_id));
        }

        trace!(cmd_id, receivers = receivers.len(), "Dispatching push");
        for receiver in &receivers {
            receiver.notify_push_message(payload.clone(), cmd_id);
        }
        Ok(Dispatch::Push(receivers.len()))
    }
}

// ============================================================================
// NetworkEventRouter - StarDelegate
// ============================================================================

impl StarDelegate for NetworkEventRouter {
    fn on_receive(&self, data: Bytes) -> i32 {
        match self.dispatch(&data) {
            Ok(_) => SUCCESS,
            Err(e) => {
                debug!(error = %e, len = data.len(), "Dropping frame");
                FAILURE
            }
        }
    }

    fn on_connection_status_changed(&self, status: Status) {
        self.notifications
            .post(&Notification::connection_status_changed(status));
    }

    fn on_finish_send(&self, payload: &Bytes, error: Option<&Error>) {
        match error {
            None => trace!(len = payload.len(), "Send finished"),
            Some(e) => debug!(len = payload.len(), error = %e, "Send failed"),
        }
    }
}

impl IpHints for NetworkEventRouter {
    fn ip_list(&self, host: &str) -> Option<Vec<String>> {
        self.ip_table.ip_list(host)
    }
}

// ============================================================================
// Tests
// ============================================================================
