//! HTTP front for the notes demo.
//!
//! hyper handles the HTTP/1.1 side. Each page render runs in its own task
//! and talks to hyper through an [`HttpTransport`]: `start` hands the
//! response head over, and every `flush` becomes one body frame, so the
//! shell reaches the browser before the payload is pushed. Routing, static
//! files and caching are absent.

use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use hyper::body::{Body, Frame, Incoming, SizeHint};
use hyper::header::{HeaderValue, CACHE_CONTROL, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use url::Url;

use crate::app::{self, Location};
use crate::component::component;
use crate::notes::NoteSource;
use crate::stream::{self, Transport};
use crate::{RenderMode, RenderOptions, RSC_HEADER};

/// Upper bound on the buffered request head, per connection.
pub const MAX_REQUEST_HEAD: usize = 64 * 1024;

/// Body frames queued between the render task and the connection.
const BODY_FRAMES: usize = 8;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Everything the demo server needs to run.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub render: RenderOptions,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            render: RenderOptions::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// ResponseBody
// ---------------------------------------------------------------------------

/// Body of every response: a complete message, or frames sent by a render
/// task as it flushes.
#[derive(Debug)]
pub enum ResponseBody {
    Full(Option<Bytes>),
    Stream(mpsc::Receiver<Bytes>),
}

impl Body for ResponseBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, Infallible>>> {
        match self.get_mut() {
            ResponseBody::Full(data) => Poll::Ready(data.take().map(|d| Ok(Frame::data(d)))),
            ResponseBody::Stream(frames) => frames
                .poll_recv(cx)
                .map(|frame| frame.map(|d| Ok(Frame::data(d)))),
        }
    }

    fn is_end_stream(&self) -> bool {
        matches!(self, ResponseBody::Full(None))
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            ResponseBody::Full(data) => {
                SizeHint::with_exact(data.as_ref().map_or(0, |d| d.len() as u64))
            }
            ResponseBody::Stream(_) => SizeHint::default(),
        }
    }
}

fn plain(status: StatusCode, text: &'static str) -> Response<ResponseBody> {
    let mut response = Response::new(ResponseBody::Full(Some(Bytes::from_static(
        text.as_bytes(),
    ))));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

// ---------------------------------------------------------------------------
// HttpTransport
// ---------------------------------------------------------------------------

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "client went away")
}

fn not_started() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "response not started")
}

/// Streams a `200` response to the connection that owns `head`.
///
/// Writes are buffered until the next `flush`, which sends them as one body
/// frame. Dropping the transport ends the body.
#[derive(Debug)]
pub struct HttpTransport {
    head: Option<oneshot::Sender<Response<ResponseBody>>>,
    frames: Option<mpsc::Sender<Bytes>>,
    pending: BytesMut,
}

impl HttpTransport {
    pub fn new(head: oneshot::Sender<Response<ResponseBody>>) -> Self {
        Self {
            head: Some(head),
            frames: None,
            pending: BytesMut::new(),
        }
    }

    /// Whether the response head has been handed over.
    pub fn started(&self) -> bool {
        self.head.is_none()
    }

    /// Answer with a complete non-200 response instead. Returns `false` once
    /// the response has started or the connection is gone.
    pub fn respond_status(&mut self, status: StatusCode, text: &'static str) -> bool {
        match self.head.take() {
            Some(head) => head.send(plain(status, text)).is_ok(),
            None => false,
        }
    }

    /// Send whatever is still buffered and end the body.
    pub async fn finish(mut self) -> io::Result<()> {
        if self.frames.is_some() {
            self.flush().await?;
        }
        Ok(())
    }
}

impl Transport for HttpTransport {
    async fn start(&mut self, content_type: &'static str) -> io::Result<()> {
        let head = self.head.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::AlreadyExists, "response already started")
        })?;
        let (tx, rx) = mpsc::channel(BODY_FRAMES);
        let mut response = Response::new(ResponseBody::Stream(rx));
        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        head.send(response).map_err(|_| closed())?;
        self.frames = Some(tx);
        Ok(())
    }

    async fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        if self.frames.is_none() {
            return Err(not_started());
        }
        self.pending.extend_from_slice(chunk);
        Ok(())
    }

    async fn flush(&mut self) -> io::Result<bool> {
        let frames = self.frames.as_ref().ok_or_else(not_started)?;
        if !self.pending.is_empty() {
            let frame = self.pending.split().freeze();
            frames.send(frame).await.map_err(|_| closed())?;
        }
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Path and `q` search parameter of a request target.
///
/// # Errors
/// The target does not resolve against the server origin.
pub fn location(target: &str) -> Result<Location, url::ParseError> {
    let url = Url::parse("http://localhost")?.join(target)?;
    let query = url
        .query_pairs()
        .find(|(k, _)| k == "q")
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default();
    Ok(Location::new(url.path(), query))
}

/// Answer one request.
///
/// Pages render in a separate task; the response is returned as soon as
/// that task starts it, and its body follows frame by frame.
pub async fn handle_request<B>(
    request: Request<B>,
    notes: Arc<dyn NoteSource>,
    opts: RenderOptions,
) -> Response<ResponseBody> {
    if request.method() != Method::GET {
        return plain(StatusCode::METHOD_NOT_ALLOWED, "method not allowed\n");
    }

    let target = request.uri().path_and_query().map_or("/", |pq| pq.as_str());
    let location = match location(target) {
        Ok(location) => location,
        Err(err) => {
            debug!(target, "bad request target: {err}");
            return plain(StatusCode::BAD_REQUEST, "bad request\n");
        }
    };
    if location.path.starts_with("/static/") || location.path == "/favicon.ico" {
        return plain(StatusCode::NOT_FOUND, "not found\n");
    }

    let mode = RenderMode::from_header(
        request
            .headers()
            .get(RSC_HEADER)
            .and_then(|v| v.to_str().ok()),
    );
    debug!(path = %location.path, ?mode, "request");

    let (head_tx, head_rx) = oneshot::channel();
    tokio::spawn(render_page(
        location,
        mode,
        notes,
        opts,
        HttpTransport::new(head_tx),
    ));
    head_rx
        .await
        .unwrap_or_else(|_| plain(StatusCode::INTERNAL_SERVER_ERROR, "render failed\n"))
}

async fn render_page(
    location: Location,
    mode: RenderMode,
    notes: Arc<dyn NoteSource>,
    opts: RenderOptions,
    mut transport: HttpTransport,
) {
    let builder = opts.builder();
    let result = stream::render(
        || {
            builder.build(
                component("Page", || app::page(&location, notes.as_ref())),
                Vec::new(),
            )
        },
        mode,
        &mut transport,
        &opts,
    )
    .await;

    match result {
        Ok(report) => info!(
            path = %location.path,
            ?mode,
            bytes = report.bytes_written,
            "rendered"
        ),
        // `stream::render` has already logged the failure.
        Err(err) if !transport.started() => {
            debug!(kind = err.kind(), "answering 500");
            transport.respond_status(StatusCode::INTERNAL_SERVER_ERROR, "render failed\n");
            return;
        }
        Err(err) => debug!(kind = err.kind(), "response cut short after partial output"),
    }
    if let Err(err) = transport.finish().await {
        debug!(path = %location.path, "body not delivered: {err}");
    }
}

// ---------------------------------------------------------------------------
// Serve
// ---------------------------------------------------------------------------

/// Accept connections forever, one task per connection.
pub async fn serve(
    listener: TcpListener,
    notes: Arc<dyn NoteSource>,
    opts: RenderOptions,
) -> io::Result<()> {
    info!(addr = %listener.local_addr()?, "strike server listening");
    loop {
        let (stream, peer) = listener.accept().await?;
        let notes = Arc::clone(&notes);
        let opts = opts.clone();
        tokio::spawn(async move {
            let service = service_fn(move |request: Request<Incoming>| {
                let notes = Arc::clone(&notes);
                let opts = opts.clone();
                async move { Ok::<_, Infallible>(handle_request(request, notes, opts).await) }
            });
            if let Err(err) = http1::Builder::new()
                .max_buf_size(MAX_REQUEST_HEAD)
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                warn!(%peer, "connection error: {err}");
            }
        });
    }
}
