//! Link event loop.
//!
//! Each launch spawns one tokio task that:
//!
//! - Dials the candidate endpoints in order until one answers
//! - Reads inbound frames and hands them to the owning star
//! - Reports the failure that ended the link, if any
//!
//! Outbound frames go through a separate writer task, so a write that never
//! completes cannot hide a failure on the read side.
//!
//! The task never touches star state directly. It reports through
//! [`LinkObserver`], tagged with the session it was spawned for, so a star
//! that has since been terminated or relaunched can ignore stale reports.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::SendId;

use super::dialer::{Dialer, Endpoint, FrameSink, Link};

// ============================================================================
// Constants
// ============================================================================

/// Upper bound on the graceful close after `terminate`.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

// ============================================================================
// LinkObserver
// ============================================================================

/// Receives reports from a link task.
///
/// Every method carries the session the task was spawned for.
pub(crate) trait LinkObserver: Send + Sync {
    /// A candidate answered. Returns `false` if the session is stale and the
    /// link should be dropped.
    fn link_established(&self, session: u64, endpoint: &Endpoint) -> bool;

    /// The link could not be established or broke.
    fn link_failed(&self, session: u64, error: &Error);

    /// One inbound frame.
    fn frame_received(&self, session: u64, frame: Bytes);

    /// One outbound frame was written, or failed to be.
    fn send_finished(&self, session: u64, id: SendId, error: Option<&Error>);
}

// ============================================================================
// LinkCommand
// ============================================================================

/// Internal commands for the event loop.
pub(crate) enum LinkCommand {
    /// Write one frame.
    Send { id: SendId, payload: Bytes },
    /// Close the link.
    Shutdown,
}

// ============================================================================
// LinkHandle
// ============================================================================

/// Owning handle to a running link task.
///
/// Dropping the handle aborts the task, which drops the link and releases the
/// socket. [`LinkHandle::shutdown`] closes gracefully instead.
pub(crate) struct LinkHandle {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<LinkCommand>,
    /// Set once shutdown starts; queued writes are skipped after that.
    closing: Arc<AtomicBool>,
    /// The event loop task.
    task: Option<JoinHandle<()>>,
}

impl LinkHandle {
    /// Queues a frame for the event loop.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the event loop has exited.
    pub(crate) fn send(&self, id: SendId, payload: Bytes) -> Result<()> {
        self.command_tx
            .send(LinkCommand::Send { id, payload })
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Starts a graceful close without waiting for it.
    ///
    /// A watchdog aborts the task if the close takes longer than
    /// [`CLOSE_TIMEOUT`].
    pub(crate) fn shutdown(mut self, runtime: &Handle) {
        self.closing.store(true, Ordering::Release);
        let _ = self.command_tx.send(LinkCommand::Shutdown);

        if let Some(mut task) = self.task.take() {
            runtime.spawn(async move {
                if timeout(CLOSE_TIMEOUT, &mut task).await.is_err() {
                    debug!("Link close timed out, aborting");
                    task.abort();
                }
            });
        }
    }
}

impl Drop for LinkHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ============================================================================
// LinkTask
// ============================================================================

/// Everything a link task needs, captured at launch.
pub(crate) struct LinkTask {
    /// Dialer used for every candidate.
    pub dialer: Arc<dyn Dialer>,
    /// Candidates in fallback order.
    pub endpoints: Vec<Endpoint>,
    /// Per-candidate connect timeout.
    pub connect_timeout: Duration,
    /// Session this task belongs to.
    pub session: u64,
    /// Owning star.
    pub observer: Weak<dyn LinkObserver>,
}

impl LinkTask {
    /// Spawns the event loop on `runtime`.
    pub(crate) fn spawn(self, runtime: &Handle) -> LinkHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let closing = Arc::new(AtomicBool::new(false));

        let task = runtime.spawn(self.run(command_rx, Arc::clone(&closing)));

        LinkHandle {
            command_tx,
            closing,
            task: Some(task),
        }
    }

    /// Runs the link from dial to close.
    async fn run(
        self,
        mut command_rx: mpsc::UnboundedReceiver<LinkCommand>,
        closing: Arc<AtomicBool>,
    ) {
        let session = self.session;

        // Nothing is admitted while connecting, so any command here means
        // the star gave up on this session.
        let dialed = tokio::select! {
            biased;
            _ = command_rx.recv() => {
                debug!(session, "Launch abandoned while dialing");
                return;
            }
            result = self.dial_any() => result,
        };

        let (endpoint, link) = match dialed {
            Ok(dialed) => dialed,
            Err(e) => {
                warn!(session, error = %e, "All candidates failed");
                self.notify(|observer| observer.link_failed(session, &e));
                return;
            }
        };

        let accepted = self
            .notify(|observer| observer.link_established(session, &endpoint))
            .unwrap_or(false);
        if !accepted {
            debug!(session, "Session is stale, dropping link");
            return;
        }

        match self.run_event_loop(link, &mut command_rx, closing).await {
            Ok(()) => debug!(session, "Link closed"),
            Err(e) => {
                warn!(session, error = %e, "Link failed");
                self.notify(|observer| observer.link_failed(session, &e));
            }
        }
    }

    /// Tries each candidate in order and returns the first link.
    async fn dial_any(&self) -> Result<(Endpoint, Link)> {
        let mut last_error = None;
        let timeout_ms = u64::try_from(self.connect_timeout.as_millis()).unwrap_or(u64::MAX);

        for endpoint in &self.endpoints {
            debug!(session = self.session, %endpoint, "Dialing candidate");

            match timeout(self.connect_timeout, self.dialer.dial(endpoint)).await {
                Ok(Ok(link)) => return Ok((endpoint.clone(), link)),
                Ok(Err(e)) => {
                    debug!(session = self.session, %endpoint, error = %e, "Candidate failed");
                    last_error = Some(e);
                }
                Err(_) => {
                    debug!(session = self.session, %endpoint, "Candidate timed out");
                    last_error = Some(Error::connection_timeout(timeout_ms));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::connection("no endpoints to dial")))
    }

    /// Event loop that handles link I/O.
    ///
    /// Returns `Ok` on a requested close and `Err` on a transport failure.
    async fn run_event_loop(
        &self,
        link: Link,
        command_rx: &mut mpsc::UnboundedReceiver<LinkCommand>,
        closing: Arc<AtomicBool>,
    ) -> Result<()> {
        let session = self.session;
        let Link { sink, mut stream } = link;

        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let mut writer = WriterGuard(tokio::spawn(write_frames(
            sink,
            write_rx,
            Weak::clone(&self.observer),
            session,
            Arc::clone(&closing),
        )));

        loop {
            tokio::select! {
                // Incoming frames from the server
                frame = stream.next() => {
                    match frame {
                        Some(Ok(data)) => {
                            trace!(session, len = data.len(), "Frame received");
                            if self.notify(|observer| observer.frame_received(session, data)).is_none() {
                                return Ok(());
                            }
                        }
                        Some(Err(e)) => return Err(e),
                        None => return Err(Error::ConnectionClosed),
                    }
                }

                // The writer only stops early when a write fails
                written = &mut writer.0 => {
                    return Err(match written {
                        Ok(Err(e)) => e,
                        Ok(Ok(())) => Error::ConnectionClosed,
                        Err(e) => Error::connection(e.to_string()),
                    });
                }

                // Commands from the star
                command = command_rx.recv() => {
                    match command {
                        Some(LinkCommand::Send { id, payload }) => {
                            if closing.load(Ordering::Acquire) {
                                continue;
                            }
                            // A closed writer surfaces through its own arm.
                            let _ = write_tx.send((id, payload));
                        }

                        Some(LinkCommand::Shutdown) | None => {
                            debug!(session, "Shutdown requested");
                            drop(write_tx);
                            let _ = timeout(CLOSE_TIMEOUT, &mut writer.0).await;
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Calls into the star if it is still alive.
    fn notify<R>(&self, f: impl FnOnce(&dyn LinkObserver) -> R) -> Option<R> {
        let observer = self.observer.upgrade()?;
        Some(f(observer.as_ref()))
    }
}

// ============================================================================
// Writer
// ============================================================================

/// Aborts the writer task when the event loop exits.
struct WriterGuard(JoinHandle<Result<()>>);

impl Drop for WriterGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Writes queued frames in order and reports each outcome.
///
/// Stops at the first failed write. Closes the sink once the queue ends.
async fn write_frames(
    mut sink: FrameSink,
    mut write_rx: mpsc::UnboundedReceiver<(SendId, Bytes)>,
    observer: Weak<dyn LinkObserver>,
    session: u64,
    closing: Arc<AtomicBool>,
) -> Result<()> {
    while let Some((id, payload)) = write_rx.recv().await {
        if closing.load(Ordering::Acquire) {
            break;
        }

        let result = sink.send(payload).await;
        trace!(session, %id, ok = result.is_ok(), "Frame written");
        if let Some(observer) = observer.upgrade() {
            observer.send_finished(session, id, result.as_ref().err());
        }
        result?;
    }

    sink.close().await
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;

    struct NullObserver;

    impl LinkObserver for NullObserver {
        fn link_established(&self, _session: u64, _endpoint: &Endpoint) -> bool {
            true
        }
        fn link_failed(&self, _session: u64, _error: &Error) {}
        fn frame_received(&self, _session: u64, _frame: Bytes) {}
        fn send_finished(&self, _session: u64, _id: SendId, _error: Option<&Error>) {}
    }

    struct RefusingDialer {
        dialed: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl Dialer for RefusingDialer {
        async fn dial(&self, endpoint: &Endpoint) -> Result<Link> {
            self.dialed.lock().push(endpoint.ip.clone());
            Err(Error::connection("refused"))
        }
    }

    #[test]
    fn test_constants() {
        assert_eq!(CLOSE_TIMEOUT.as_secs(), 2);
    }

    #[tokio::test]
    async fn test_dial_any_tries_every_candidate() {
        let dialer = Arc::new(RefusingDialer {
            dialed: Mutex::new(Vec::new()),
        });
        let observer: Arc<dyn LinkObserver> = Arc::new(NullObserver);
        let task = LinkTask {
            dialer: Arc::clone(&dialer) as Arc<dyn Dialer>,
            endpoints: vec![
                Endpoint::new("example.com", "1.1.1.1", 80),
                Endpoint::new("example.com", "2.2.2.2", 80),
            ],
            connect_timeout: Duration::from_secs(1),
            session: 1,
            observer: Arc::downgrade(&observer),
        };

        let result = task.dial_any().await;

        assert!(matches!(result, Err(Error::Connection { .. })));
        assert_eq!(*dialer.dialed.lock(), vec!["1.1.1.1", "2.2.2.2"]);
    }

    #[tokio::test]
    async fn test_dial_any_without_endpoints() {
        let observer: Arc<dyn LinkObserver> = Arc::new(NullObserver);
        let task = LinkTask {
            dialer: Arc::new(RefusingDialer {
                dialed: Mutex::new(Vec::new()),
            }),
            endpoints: Vec::new(),
            connect_timeout: Duration::from_secs(1),
            session: 1,
            observer: Arc::downgrade(&observer),
        };

        let err = task.dial_any().await.err().unwrap();
        assert!(err.is_transport_error());
    }
}
