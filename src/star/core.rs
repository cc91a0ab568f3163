//! The star: one persistent, relaunchable client connection.
//!
//! # Locking
//!
//! Three guards, always acquired in this order and never the reverse:
//!
//! 1. `gate`: reentrant, held across every status commit and every delegate
//!    callback, so transitions reach the delegate in commit order and
//!    `terminate` can wait out an in-flight callback.
//! 2. `state`: status, session counter, target address, link handle.
//! 3. `pending`: sends awaiting completion.
//!
//! `state` and `pending` are never held while a delegate runs. `send` takes
//! only `state` and `pending`, so it never waits on a callback.
//!
//! # Sessions
//!
//! Every `launch` and `terminate` bumps the session counter. Link tasks tag
//! their reports with the session they were spawned for, and reports for an
//! old session are ignored.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use bytes::Bytes;
use parking_lot::{Mutex, ReentrantMutex};
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::{Map, Value};
use tokio::runtime::Handle;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::SendId;
use crate::transport::connection::{LinkHandle, LinkObserver, LinkTask};
use crate::transport::{Dialer, Endpoint};

use super::builder::StarBuilder;
use super::delegate::{FAILURE, IpHints, SUCCESS, StarDelegate};
use super::options::LaunchOptions;
use super::status::Status;

// ============================================================================
// Types
// ============================================================================

/// Validated configuration produced by [`StarBuilder`].
pub(crate) struct StarConfig {
    pub host: String,
    pub port: u16,
    pub delegate: Arc<dyn StarDelegate>,
    pub ip_hints: Option<Arc<dyn IpHints>>,
    pub dialer: Arc<dyn Dialer>,
    pub connect_timeout: Duration,
    pub max_pending_sends: usize,
    pub runtime: Handle,
}

/// A send that asked for a completion callback.
struct PendingSend {
    /// Session the send was admitted in.
    session: u64,
    /// Payload handed back to the handler.
    payload: Bytes,
    /// Receives `on_finish_send` exactly once.
    handler: Arc<dyn StarDelegate>,
}

/// Map of send IDs to their completion handlers.
type PendingMap = FxHashMap<SendId, PendingSend>;

/// Mutable connection state.
struct StarState {
    status: Status,
    session: u64,
    host: String,
    port: u16,
    /// Address of the candidate that answered.
    ip: Option<String>,
    link: Option<LinkHandle>,
}

/// Internal shared state for a star.
pub(crate) struct StarInner {
    config: StarConfig,
    gate: ReentrantMutex<()>,
    state: Mutex<StarState>,
    pending: Mutex<PendingMap>,
    foreground: AtomicBool,
}

// ============================================================================
// Star
// ============================================================================

/// Persistent client connection.
///
/// A star owns at most one link at a time. [`launch`](Self::launch) starts
/// dialing in the background and returns immediately; progress is reported
/// through the [`StarDelegate`]'s status callback. Sends are admitted only
/// while [`Status::Connected`].
///
/// Cloning a star yields another handle to the same connection.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use stargate::{Frame, NetworkEventRouter, Star};
///
/// # async fn example() -> stargate::Result<()> {
/// let router = Arc::new(NetworkEventRouter::new());
/// router.add_ip_address("10.0.0.2", "im.example.com");
///
/// let star = Star::builder()
///     .server("im.example.com", 8081)
///     .delegate(router.clone())
///     .ip_hints(router.clone())
///     .build()?;
///
/// star.launch(None);
/// // ... once connected:
/// star.send(Frame::new(1, "hello").encode());
/// star.terminate();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Star {
    /// Shared inner state.
    inner: Arc<StarInner>,
}

// ============================================================================
// Star - Display
// ============================================================================

impl fmt::Debug for Star {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Star")
            .field("host", &state.host)
            .field("port", &state.port)
            .field("ip", &state.ip)
            .field("status", &state.status)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Star - Constructor
// ============================================================================

impl Star {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> StarBuilder {
        StarBuilder::new()
    }

    /// Creates a star in [`Status::Init`].
    pub(crate) fn new(config: StarConfig) -> Self {
        let state = StarState {
            status: Status::Init,
            session: 0,
            host: config.host.clone(),
            port: config.port,
            ip: None,
            link: None,
        };

        Self {
            inner: Arc::new(StarInner {
                config,
                gate: ReentrantMutex::new(()),
                state: Mutex::new(state),
                pending: Mutex::new(PendingMap::default()),
                foreground: AtomicBool::new(true),
            }),
        }
    }
}

// ============================================================================
// Star - Accessors
// ============================================================================

impl Star {
    /// Returns the current status.
    #[inline]
    #[must_use]
    pub fn status(&self) -> Status {
        self.inner.state.lock().status
    }

    /// Returns `true` if sends are admitted.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    /// Returns the server host name.
    #[inline]
    #[must_use]
    pub fn server_address(&self) -> String {
        self.inner.state.lock().host.clone()
    }

    /// Returns the address of the candidate that answered, while connected.
    #[inline]
    #[must_use]
    pub fn ip(&self) -> Option<String> {
        self.inner.state.lock().ip.clone()
    }

    /// Returns the server port.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.inner.state.lock().port
    }

    /// Returns the number of sends awaiting completion.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Returns `false` between `enter_background` and `enter_foreground`.
    #[inline]
    #[must_use]
    pub fn is_foreground(&self) -> bool {
        self.inner.foreground.load(Ordering::Acquire)
    }
}

// ============================================================================
// Star - Lifecycle
// ============================================================================

impl Star {
    /// Starts connecting, parsing overrides from a launch mapping.
    ///
    /// Returns `true` without doing anything if already connecting or
    /// connected, whatever the mapping holds. Otherwise returns `false` if
    /// the mapping or the merged configuration is invalid.
    pub fn launch(&self, options: Option<&Map<String, Value>>) -> bool {
        let options = options
            .map(LaunchOptions::from_map)
            .transpose()
            .map(Option::unwrap_or_default);

        self.start(options)
    }

    /// Starts connecting with typed overrides.
    ///
    /// Same contract as [`launch`](Self::launch).
    pub fn launch_with(&self, options: &LaunchOptions) -> bool {
        self.start(Ok(options.clone()))
    }

    fn start(&self, options: Result<LaunchOptions>) -> bool {
        let inner = &self.inner;
        let _gate = inner.gate.lock();

        {
            let mut state = inner.state.lock();
            if !state.status.is_launchable() {
                debug!(status = %state.status, "Launch ignored, already active");
                return true;
            }

            let options = match options.and_then(|o| o.validate().map(|()| o)) {
                Ok(options) => options,
                Err(e) => {
                    warn!(error = %e, "Invalid launch options");
                    return false;
                }
            };

            if let Some(host) = &options.host {
                state.host.clone_from(host);
            }
            if let Some(port) = options.port {
                state.port = port;
            }

            let endpoints = inner.candidates(&state.host, state.port, &options.ips);
            state.session += 1;
            state.ip = None;

            let observer = Arc::downgrade(&self.inner);
            let observer: Weak<dyn LinkObserver> = observer;
            let task = LinkTask {
                dialer: Arc::clone(&inner.config.dialer),
                endpoints,
                connect_timeout: options
                    .connect_timeout()
                    .unwrap_or(inner.config.connect_timeout),
                session: state.session,
                observer,
            };
            state.link = Some(task.spawn(&inner.config.runtime));

            commit(&mut state, Status::Connecting);
            info!(
                session = state.session,
                host = %state.host,
                port = state.port,
                "Star launching"
            );
        }

        inner.publish(Status::Connecting);
        true
    }

    /// Tears down the current link.
    ///
    /// Every send still awaiting completion receives [`Error::Cancelled`]
    /// before this returns, and no delegate callback fires for the old
    /// session afterwards. Safe to call repeatedly.
    pub fn terminate(&self) {
        let inner = &self.inner;
        let _gate = inner.gate.lock();

        let (changed, link) = {
            let mut state = inner.state.lock();
            let changed = commit(&mut state, Status::Init);
            state.session += 1;
            state.ip = None;
            (changed, state.link.take())
        };

        if let Some(link) = link {
            link.shutdown(&inner.config.runtime);
        }

        let cancelled: Vec<PendingSend> = inner
            .pending
            .lock()
            .drain()
            .map(|(_, pending)| pending)
            .collect();

        if !cancelled.is_empty() {
            debug!(count = cancelled.len(), "Cancelling pending sends");
        }
        for pending in cancelled {
            pending
                .handler
                .on_finish_send(&pending.payload, Some(&Error::Cancelled));
        }

        if changed {
            info!("Star terminated");
            inner.publish(Status::Init);
        }
    }

    /// Lifecycle hint: the application moved to the background.
    ///
    /// Does not touch the link.
    pub fn enter_background(&self) {
        if self.inner.foreground.swap(false, Ordering::AcqRel) {
            debug!(status = %self.status(), "Entered background");
        }
    }

    /// Lifecycle hint: the application returned to the foreground.
    ///
    /// Does not touch the link.
    pub fn enter_foreground(&self) {
        if !self.inner.foreground.swap(true, Ordering::AcqRel) {
            debug!(status = %self.status(), "Entered foreground");
        }
    }
}

// ============================================================================
// Star - Sending
// ============================================================================

impl Star {
    /// Queues `payload` for transmission.
    ///
    /// Returns [`SUCCESS`] once queued, or [`FAILURE`] without any I/O if not
    /// connected. Write failures only surface as a move to
    /// [`Status::Error`].
    pub fn send(&self, payload: impl Into<Bytes>) -> i32 {
        match self.try_send(payload) {
            Ok(_) => SUCCESS,
            Err(e) => {
                debug!(error = %e, "Send refused");
                FAILURE
            }
        }
    }

    /// Queues `payload` and reports its outcome to `handler`.
    ///
    /// Admission is the same as [`send`](Self::send). Once admitted,
    /// `handler.on_finish_send` runs exactly once: on write, on link failure,
    /// or on `terminate`.
    pub fn send_with_handler(
        &self,
        payload: impl Into<Bytes>,
        handler: Arc<dyn StarDelegate>,
    ) -> i32 {
        match self.try_send_with_handler(payload, handler) {
            Ok(_) => SUCCESS,
            Err(e) => {
                debug!(error = %e, "Send refused");
                FAILURE
            }
        }
    }

    /// Queues `payload`, returning its id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] if the star is not connected.
    pub fn try_send(&self, payload: impl Into<Bytes>) -> Result<SendId> {
        self.inner.admit(payload.into(), None)
    }

    /// Queues `payload` with a completion handler, returning its id.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the star is not connected
    /// - [`Error::TooManyPendingSends`] if the pending limit is reached
    pub fn try_send_with_handler(
        &self,
        payload: impl Into<Bytes>,
        handler: Arc<dyn StarDelegate>,
    ) -> Result<SendId> {
        self.inner.admit(payload.into(), Some(handler))
    }
}

// ============================================================================
// StarInner
// ============================================================================

impl StarInner {
    /// Builds the dial list: launch IPs, then hints, then the host itself.
    fn candidates(&self, host: &str, port: u16, launch_ips: &[String]) -> Vec<Endpoint> {
        let hinted = self
            .config
            .ip_hints
            .as_ref()
            .and_then(|hints| hints.ip_list(host))
            .unwrap_or_default();

        let mut seen = FxHashSet::default();
        launch_ips
            .iter()
            .cloned()
            .chain(hinted)
            .chain(std::iter::once(host.to_string()))
            .filter(|ip| seen.insert(ip.clone()))
            .map(|ip| Endpoint::new(host, ip, port))
            .collect()
    }

    /// Admission check plus enqueue, atomic with respect to `terminate`.
    fn admit(&self, payload: Bytes, handler: Option<Arc<dyn StarDelegate>>) -> Result<SendId> {
        let state = self.state.lock();
        let link = match (&state.link, state.status) {
            (Some(link), Status::Connected) => link,
            _ => return Err(Error::not_connected(state.status)),
        };

        let id = SendId::generate();

        if let Some(handler) = handler {
            let mut pending = self.pending.lock();
            if pending.len() >= self.config.max_pending_sends {
                return Err(Error::TooManyPendingSends {
                    limit: self.config.max_pending_sends,
                });
            }
            pending.insert(
                id,
                PendingSend {
                    session: state.session,
                    payload: payload.clone(),
                    handler,
                },
            );
        }

        if link.send(id, payload).is_err() {
            // Event loop already gone; its failure report is on the way.
            self.pending.lock().remove(&id);
            return Err(Error::not_connected(Status::Error));
        }

        trace!(%id, session = state.session, "Send admitted");
        Ok(id)
    }

    /// Returns `true` if `session` is current and in `status`.
    fn is_current(&self, session: u64, status: Status) -> bool {
        let state = self.state.lock();
        state.session == session && state.status == status
    }

    /// Forwards a committed transition to the delegate.
    ///
    /// Must be called with the gate held.
    fn publish(&self, status: Status) {
        self.config.delegate.on_connection_status_changed(status);
    }
}

impl Drop for StarInner {
    fn drop(&mut self) {
        if self.state.get_mut().link.take().is_some() {
            debug!("Star dropped with an active link, aborting it");
        }
    }
}

// ============================================================================
// StarInner - LinkObserver
// ============================================================================

impl LinkObserver for StarInner {
    fn link_established(&self, session: u64, endpoint: &Endpoint) -> bool {
        let _gate = self.gate.lock();

        {
            let mut state = self.state.lock();
            if state.session != session || state.status != Status::Connecting {
                return false;
            }
            state.ip = Some(endpoint.ip.clone());
            commit(&mut state, Status::Connected);
        }

        info!(session, %endpoint, "Star connected");
        self.publish(Status::Connected);
        true
    }

    fn link_failed(&self, session: u64, error: &Error) {
        let _gate = self.gate.lock();

        let link = {
            let mut state = self.state.lock();
            if state.session != session || !commit(&mut state, Status::Error) {
                return;
            }
            state.ip = None;
            state.link.take()
        };
        // The reporting task is already on its way out.
        drop(link);

        warn!(session, error = %error, "Star link failed");
        self.publish(Status::Error);

        let failed: Vec<PendingSend> = self
            .pending
            .lock()
            .extract_if(|_, pending| pending.session == session)
            .map(|(_, pending)| pending)
            .collect();

        for pending in failed {
            let err = Error::connection(error.to_string());
            pending.handler.on_finish_send(&pending.payload, Some(&err));
        }
    }

    fn frame_received(&self, session: u64, frame: Bytes) {
        let _gate = self.gate.lock();

        if !self.is_current(session, Status::Connected) {
            trace!(session, "Dropping frame for stale session");
            return;
        }

        let len = frame.len();
        if self.config.delegate.on_receive(frame) != SUCCESS {
            warn!(session, len, "Delegate rejected frame");
        }
    }

    fn send_finished(&self, session: u64, id: SendId, error: Option<&Error>) {
        let _gate = self.gate.lock();

        // Plain sends have no entry; cancelled or failed ones were drained.
        let Some(pending) = self.pending.lock().remove(&id) else {
            return;
        };

        trace!(session, %id, ok = error.is_none(), "Send finished");
        pending.handler.on_finish_send(&pending.payload, error);
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Applies `next` if it is a legal edge. Returns `true` if the status changed.
fn commit(state: &mut StarState, next: Status) -> bool {
    let prev = state.status;
    if prev == next {
        return false;
    }
    if !prev.can_transition_to(next) {
        warn!(from = %prev, to = %next, "Illegal status transition ignored");
        return false;
    }

    state.status = next;
    debug!(session = state.session, from = %prev, to = %next, "Status changed");
    true
}

// ============================================================================
// Tests
// ============================================================================
