//! Dialing remote endpoints.
//!
//! A [`Dialer`] turns an [`Endpoint`] into a [`Link`]: a framed byte sink
//! paired with a framed byte stream. [`WebSocketDialer`] is the default and
//! carries each frame as one binary WebSocket message.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future;
use std::net::IpAddr;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::sink::Sink;
use futures_util::stream::Stream;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Types
// ============================================================================

/// Outbound half of a link.
pub type FrameSink = Pin<Box<dyn Sink<Bytes, Error = Error> + Send>>;

/// Inbound half of a link.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

// ============================================================================
// Endpoint
// ============================================================================

/// One dial candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Logical server host name.
    pub host: String,
    /// Address actually dialed (an IP hint, or the host name itself).
    pub ip: String,
    /// Server port.
    pub port: u16,
}

impl Endpoint {
    /// Creates an endpoint.
    #[inline]
    #[must_use]
    pub fn new(host: impl Into<String>, ip: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            ip: ip.into(),
            port,
        }
    }

    /// Returns `ip:port`, bracketing IPv6 literals.
    #[must_use]
    pub fn authority(&self) -> String {
        match self.ip.parse::<IpAddr>() {
            Ok(IpAddr::V6(v6)) => format!("[{v6}]:{}", self.port),
            _ => format!("{}:{}", self.ip, self.port),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host == self.ip {
            write!(f, "{}", self.authority())
        } else {
            write!(f, "{} ({})", self.authority(), self.host)
        }
    }
}

// ============================================================================
// Link
// ============================================================================

/// An established, framed, bidirectional connection.
pub struct Link {
    /// Frames written to the remote end.
    pub sink: FrameSink,
    /// Frames read from the remote end.
    pub stream: FrameStream,
}

impl Link {
    /// Wraps an arbitrary sink/stream pair.
    pub fn new<S, R>(sink: S, stream: R) -> Self
    where
        S: Sink<Bytes, Error = Error> + Send + 'static,
        R: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Self {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        }
    }

    /// Adapts a WebSocket stream: one binary message per frame.
    ///
    /// Text, ping, pong and close messages are not frames and are skipped.
    pub fn websocket<S>(ws_stream: WebSocketStream<S>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (ws_write, ws_read) = ws_stream.split();

        let sink = ws_write
            .sink_map_err(Error::from)
            .with(|frame: Bytes| future::ready(Ok::<_, Error>(Message::Binary(frame))));

        let stream = ws_read.filter_map(|message| {
            future::ready(match message {
                Ok(Message::Binary(data)) => Some(Ok(data)),
                Ok(_) => None,
                Err(e) => Some(Err(Error::from(e))),
            })
        });

        Self::new(sink, stream)
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link").finish_non_exhaustive()
    }
}

// ============================================================================
// Dialer
// ============================================================================

/// Opens links to endpoints.
///
/// Implementations must not apply their own retry policy; the star walks the
/// candidate list and applies the connect timeout.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    /// Connects to `endpoint`.
    async fn dial(&self, endpoint: &Endpoint) -> Result<Link>;
}

// ============================================================================
// WebSocketDialer
// ============================================================================

/// Dials `ws://{ip}:{port}{path}`.
#[derive(Debug, Clone)]
pub struct WebSocketDialer {
    /// Request path, always starting with `/`.
    path: String,
}

impl Default for WebSocketDialer {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
        }
    }
}

impl WebSocketDialer {
    /// Creates a dialer for the root path.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the request path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        self
    }

    /// Builds the URL dialed for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Url`] if the endpoint does not form a valid URL.
    pub fn url_for(&self, endpoint: &Endpoint) -> Result<Url> {
        Ok(Url::parse(&format!(
            "ws://{}{}",
            endpoint.authority(),
            self.path
        ))?)
    }
}

#[async_trait]
impl Dialer for WebSocketDialer {
    async fn dial(&self, endpoint: &Endpoint) -> Result<Link> {
        let url = self.url_for(endpoint)?;
        debug!(%url, "Dialing WebSocket");

        let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| Error::connection(format!("WebSocket connect to {url} failed: {e}")))?;

        Ok(Link::websocket(ws_stream))
    }
}

// ============================================================================
// Tests
// ============================================================================
