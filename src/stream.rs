//! Streaming render driver.
//!
//! Full-page responses move through
//! `ShellStarted → BodyFlushed → PayloadPushed → Done`: the doctype and the
//! HTML rendering are written first, flushed when the transport can flush,
//! and only then is the payload pushed inside a script element. Payload-only
//! responses skip the HTML entirely.
//!
//! A failure at any step stops the sequence. Bytes already handed to the
//! transport stay there; the report of a failed render is the error itself.

use std::future::Future;
use std::io;

use tracing::{debug, error, info};

use crate::utils::escape_script_json;
use crate::{html, payload, Node, RenderMode, RenderOptions, Result, StrikeError};

pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
pub const PAYLOAD_CONTENT_TYPE: &str = "text/x-component; charset=utf-8";
pub const DOCTYPE: &str = "<!doctype html>";

/// Opening of the payload push script. Queue name and initialization are
/// read by the client runtime and must not change.
pub const PUSH_SCRIPT_OPEN: &str = "<script>self.__rsc=self.__rsc||[];__rsc.push(";
pub const PUSH_SCRIPT_CLOSE: &str = ")</script>";

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Output side of one response.
pub trait Transport: Send {
    /// Begin the response with the given content type. Called once, before
    /// any `write`.
    fn start(&mut self, content_type: &'static str)
        -> impl Future<Output = io::Result<()>> + Send;

    fn write(&mut self, chunk: &[u8]) -> impl Future<Output = io::Result<()>> + Send;

    /// Push buffered bytes to the peer. Returns `Ok(false)` when the
    /// transport cannot flush incrementally.
    fn flush(&mut self) -> impl Future<Output = io::Result<bool>> + Send;
}

/// Something observed by a [`BufferedTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Start(&'static str),
    Write(String),
    Flush,
}

/// In-memory transport that records every call in order.
#[derive(Debug, Default)]
pub struct BufferedTransport {
    events: Vec<TransportEvent>,
    flushable: bool,
}

impl BufferedTransport {
    /// A transport that supports incremental flushing.
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            flushable: true,
        }
    }

    /// A transport that buffers everything until the response ends.
    pub fn unflushable() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[TransportEvent] {
        &self.events
    }

    pub fn content_type(&self) -> Option<&'static str> {
        self.events.iter().find_map(|e| match e {
            TransportEvent::Start(ct) => Some(*ct),
            _ => None,
        })
    }

    /// Concatenation of all written chunks.
    pub fn body(&self) -> String {
        self.events
            .iter()
            .filter_map(|e| match e {
                TransportEvent::Write(chunk) => Some(chunk.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Transport for BufferedTransport {
    async fn start(&mut self, content_type: &'static str) -> io::Result<()> {
        self.events.push(TransportEvent::Start(content_type));
        Ok(())
    }

    async fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        let chunk = std::str::from_utf8(chunk)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.events.push(TransportEvent::Write(chunk.to_string()));
        Ok(())
    }

    async fn flush(&mut self) -> io::Result<bool> {
        if self.flushable {
            self.events.push(TransportEvent::Flush);
        }
        Ok(self.flushable)
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Protocol states, in the order a full-page render reaches them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    ShellStarted,
    BodyFlushed,
    PayloadPushed,
    Done,
}

/// Outcome of a successful render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderReport {
    pub mode: RenderMode,
    /// States reached, in order. `BodyFlushed` is absent when the
    /// transport could not flush.
    pub states: Vec<StreamState>,
    pub bytes_written: usize,
}

/// Wrap a JSON payload in the push script.
///
/// The runtime receives the payload as JSON *text*: the queue entry is a
/// string literal that the client parses itself.
///
/// # Errors
/// `StrikeError::Serialization` if the text cannot be quoted.
pub fn push_script(payload_json: &str) -> Result<String> {
    let literal = serde_json::to_string(payload_json)
        .map_err(|e| StrikeError::Serialization(e.to_string()))?;
    let body = escape_script_json(&literal);
    let mut script =
        String::with_capacity(PUSH_SCRIPT_OPEN.len() + body.len() + PUSH_SCRIPT_CLOSE.len());
    script.push_str(PUSH_SCRIPT_OPEN);
    script.push_str(&body);
    script.push_str(PUSH_SCRIPT_CLOSE);
    Ok(script)
}

/// Build the tree with `build`, then stream it to `transport` in `mode`.
///
/// The tree is built before anything is written, so construction errors
/// never leave partial output behind. Later failures do.
///
/// # Errors
/// Whatever the build, the serializers, or the transport fail with.
pub async fn render<T, F>(
    build: F,
    mode: RenderMode,
    transport: &mut T,
    opts: &RenderOptions,
) -> Result<RenderReport>
where
    T: Transport,
    F: FnOnce() -> Result<Node>,
{
    let result = match build() {
        Ok(tree) => drive(&tree, mode, transport, opts).await,
        Err(err) => Err(err),
    };
    if let Err(ref err) = result {
        error!(kind = err.kind(), ?mode, "render aborted: {err}");
    }
    result
}

async fn drive<T: Transport>(
    tree: &Node,
    mode: RenderMode,
    transport: &mut T,
    opts: &RenderOptions,
) -> Result<RenderReport> {
    let mut report = RenderReport {
        mode,
        states: Vec::with_capacity(4),
        bytes_written: 0,
    };

    if mode == RenderMode::PayloadOnly {
        let json = payload::to_payload_string(tree)?;
        transport.start(PAYLOAD_CONTENT_TYPE).await?;
        write(transport, &mut report, json.as_bytes()).await?;
        report.states.push(StreamState::Done);
        info!(bytes = report.bytes_written, "payload sent");
        return Ok(report);
    }

    // ShellStarted
    let html = html::to_html(tree)?;
    transport.start(HTML_CONTENT_TYPE).await?;
    report.states.push(StreamState::ShellStarted);
    write(transport, &mut report, DOCTYPE.as_bytes()).await?;
    write(transport, &mut report, html.as_bytes()).await?;

    // BodyFlushed
    if transport.flush().await? {
        report.states.push(StreamState::BodyFlushed);
        debug!(bytes = report.bytes_written, "shell flushed");
        if !opts.flush_delay.is_zero() {
            tokio::time::sleep(opts.flush_delay).await;
        }
    } else {
        debug!("transport cannot flush, shell stays buffered");
    }

    // PayloadPushed
    let script = push_script(&payload::to_payload_string(tree)?)?;
    write(transport, &mut report, script.as_bytes()).await?;
    report.states.push(StreamState::PayloadPushed);

    report.states.push(StreamState::Done);
    info!(bytes = report.bytes_written, "page streamed");
    Ok(report)
}

async fn write<T: Transport>(
    transport: &mut T,
    report: &mut RenderReport,
    chunk: &[u8],
) -> Result<()> {
    transport.write(chunk).await.map_err(StrikeError::Transport)?;
    report.bytes_written += chunk.len();
    Ok(())
}
