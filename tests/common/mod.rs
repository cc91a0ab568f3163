//! Shared fixtures for integration tests.
//!
//! - [`MockDialer`]: in-memory links, with refusal and stall switches
//! - [`Peer`]: the server side of one mock link
//! - [`Recorder`]: a delegate that records every callback
//! - [`eventually`]: polls a condition until it holds

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use std::future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{sink, stream};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use stargate::{
    Dialer, Endpoint, Error, FAILURE, IpHints, Link, Result, SUCCESS, Star, StarDelegate, Status,
};
use tokio::sync::mpsc;

// ============================================================================
// Constants
// ============================================================================

pub const HOST: &str = "im.test";
pub const PORT: u16 = 8081;

const POLL_INTERVAL: Duration = Duration::from_millis(5);
const POLL_TIMEOUT: Duration = Duration::from_secs(3);

// ============================================================================
// Peer
// ============================================================================

/// Server side of a mock link.
pub struct Peer {
    /// Frames (or a failure) delivered to the star.
    pub to_star: mpsc::UnboundedSender<Result<Bytes>>,
    /// Frames the star wrote.
    pub from_star: mpsc::UnboundedReceiver<Bytes>,
    /// Candidate the star dialed.
    pub endpoint: Endpoint,
}

impl Peer {
    /// Pushes one inbound frame.
    pub fn push(&self, frame: impl Into<Bytes>) {
        let _ = self.to_star.send(Ok(frame.into()));
    }

    /// Breaks the link from the server side.
    pub fn fail(&self, message: &str) {
        let _ = self.to_star.send(Err(Error::connection(message)));
    }
}

// ============================================================================
// MockDialer
// ============================================================================

/// Dialer producing in-memory links.
#[derive(Default)]
pub struct MockDialer {
    refused: Mutex<FxHashSet<String>>,
    refuse_all: AtomicBool,
    stall_writes: AtomicBool,
    hold_dials: AtomicBool,
    dialed: Mutex<Vec<String>>,
    peers: Mutex<Option<mpsc::UnboundedSender<Peer>>>,
}

impl MockDialer {
    /// Creates a dialer and the receiver that yields one [`Peer`] per link.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Peer>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let dialer = Self::default();
        *dialer.peers.lock() = Some(tx);
        (Arc::new(dialer), rx)
    }

    /// Refuses dials to `ip`.
    pub fn refuse(&self, ip: &str) {
        self.refused.lock().insert(ip.to_string());
    }

    /// Refuses every dial.
    pub fn refuse_all(&self) {
        self.refuse_all.store(true, Ordering::SeqCst);
    }

    /// Makes every write on links dialed from now on hang forever.
    pub fn stall_writes(&self) {
        self.stall_writes.store(true, Ordering::SeqCst);
    }

    /// Makes every dial from now on hang forever.
    pub fn hold_dials(&self) {
        self.hold_dials.store(true, Ordering::SeqCst);
    }

    /// Addresses dialed so far, in order.
    pub fn dialed(&self) -> Vec<String> {
        self.dialed.lock().clone()
    }
}

#[async_trait]
impl Dialer for MockDialer {
    async fn dial(&self, endpoint: &Endpoint) -> Result<Link> {
        self.dialed.lock().push(endpoint.ip.clone());

        if self.hold_dials.load(Ordering::SeqCst) {
            future::pending::<()>().await;
        }
        if self.refuse_all.load(Ordering::SeqCst) || self.refused.lock().contains(&endpoint.ip) {
            return Err(Error::connection(format!("{endpoint} refused")));
        }

        let (to_star, inbound) = mpsc::unbounded_channel::<Result<Bytes>>();
        let (outbound, from_star) = mpsc::unbounded_channel::<Bytes>();
        let stall = self.stall_writes.load(Ordering::SeqCst);

        let sink = sink::unfold(outbound, move |outbound, frame: Bytes| async move {
            if stall {
                future::pending::<()>().await;
            }
            outbound.send(frame).map_err(|_| Error::ConnectionClosed)?;
            Ok::<_, Error>(outbound)
        });
        let stream = stream::unfold(inbound, |mut inbound| async move {
            inbound.recv().await.map(|item| (item, inbound))
        });

        if let Some(peers) = self.peers.lock().as_ref() {
            let _ = peers.send(Peer {
                to_star,
                from_star,
                endpoint: endpoint.clone(),
            });
        }

        Ok(Link::new(sink, stream))
    }
}

// ============================================================================
// Recorder
// ============================================================================

/// How one send finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Written,
    Cancelled,
    Failed(String),
}

impl Outcome {
    fn of(error: Option<&Error>) -> Self {
        match error {
            None => Self::Written,
            Some(Error::Cancelled) => Self::Cancelled,
            Some(e) => Self::Failed(e.to_string()),
        }
    }
}

/// Delegate that records every callback.
#[derive(Default)]
pub struct Recorder {
    statuses: Mutex<Vec<Status>>,
    frames: Mutex<Vec<Bytes>>,
    finished: Mutex<Vec<(Bytes, Outcome)>>,
    reject_frames: AtomicBool,
    receive_calls: AtomicUsize,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn statuses(&self) -> Vec<Status> {
        self.statuses.lock().clone()
    }

    pub fn last_status(&self) -> Option<Status> {
        self.statuses.lock().last().copied()
    }

    pub fn frames(&self) -> Vec<Bytes> {
        self.frames.lock().clone()
    }

    pub fn finished(&self) -> Vec<(Bytes, Outcome)> {
        self.finished.lock().clone()
    }

    pub fn outcomes(&self) -> Vec<Outcome> {
        self.finished.lock().iter().map(|(_, o)| o.clone()).collect()
    }

    pub fn reject_frames(&self) {
        self.reject_frames.store(true, Ordering::SeqCst);
    }

    pub fn receive_calls(&self) -> usize {
        self.receive_calls.load(Ordering::SeqCst)
    }
}

impl StarDelegate for Recorder {
    fn on_receive(&self, data: Bytes) -> i32 {
        self.receive_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_frames.load(Ordering::SeqCst) {
            return FAILURE;
        }
        self.frames.lock().push(data);
        SUCCESS
    }

    fn on_connection_status_changed(&self, status: Status) {
        self.statuses.lock().push(status);
    }

    fn on_finish_send(&self, payload: &Bytes, error: Option<&Error>) {
        self.finished.lock().push((payload.clone(), Outcome::of(error)));
    }
}

// ============================================================================
// Hints
// ============================================================================

/// Fixed IP hints for every host.
pub struct StaticHints(pub Vec<&'static str>);

impl IpHints for StaticHints {
    fn ip_list(&self, _host: &str) -> Option<Vec<String>> {
        Some(self.0.iter().map(|ip| (*ip).to_string()).collect())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Builds a star on the mock dialer with `recorder` as delegate.
pub fn star(dialer: &Arc<MockDialer>, recorder: &Arc<Recorder>) -> Star {
    Star::builder()
        .server(HOST, PORT)
        .delegate(recorder.clone())
        .dialer(dialer.clone())
        .connect_timeout(Duration::from_secs(1))
        .build()
        .expect("star builds inside a runtime")
}

/// Polls `condition` until it holds or a few seconds pass.
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + POLL_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    condition()
}

/// Launches `star` and waits for the mock link to come up.
pub async fn connect(star: &Star, peers: &mut mpsc::UnboundedReceiver<Peer>) -> Peer {
    assert!(star.launch(None));
    let peer = tokio::time::timeout(POLL_TIMEOUT, peers.recv())
        .await
        .expect("dial within timeout")
        .expect("dialer alive");
    assert!(eventually(|| star.status() == Status::Connected).await);
    peer
}

/// Initializes test logging once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
