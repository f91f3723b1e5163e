// Response bodies and the disposable payload.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};
use http_body_util::{combinators::BoxBody, BodyExt, Empty, Full};
use tokio::sync::mpsc;

/// Body type every server variant responds with.
pub type ServerBody = BoxBody<Bytes, hyper::Error>;

pub fn empty() -> ServerBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed()
}

pub fn full<T: Into<Bytes>>(chunk: T) -> ServerBody {
    Full::new(chunk.into())
        .map_err(|never| match never {})
        .boxed()
}

static BOILERPLATE_HTML: &[u8] = include_bytes!("../assets/boilerplate.html");

/// The fixed content a disposable server hands out: an HTML page and an
/// optional script served at `/bundle.js`. Built once, never mutated.
///
/// Both parts accept text or pre-encoded bytes; lengths are always counted
/// in bytes.
#[derive(Debug, Clone)]
pub struct DisposablePayload {
    html: Bytes,
    javascript: Option<Bytes>,
}

// -- Constructors

impl DisposablePayload {
    #[must_use]
    pub fn new(html: impl Into<Bytes>) -> Self {
        Self {
            html: html.into(),
            javascript: None,
        }
    }

    #[must_use]
    pub fn with_javascript(mut self, javascript: impl Into<Bytes>) -> Self {
        self.javascript = Some(javascript.into());
        self
    }
}

impl Default for DisposablePayload {
    /// Falls back to the embedded boilerplate page, which pulls in
    /// `/bundle.js`.
    fn default() -> Self {
        Self {
            html: Bytes::from_static(BOILERPLATE_HTML),
            javascript: None,
        }
    }
}

// -- Getters

impl DisposablePayload {
    #[must_use]
    pub fn html(&self) -> &Bytes {
        &self.html
    }

    #[must_use]
    pub fn javascript(&self) -> Option<&Bytes> {
        self.javascript.as_ref()
    }
}

/// Wraps a fixed payload and fires `done` once the final frame has been
/// handed to the transport. This is how the disposable server learns that
/// its qualifying response actually finished, rather than was merely built.
/// A body dropped before completion fires nothing.
pub struct NotifyBody {
    inner: Full<Bytes>,
    done: Option<mpsc::Sender<()>>,
}

impl NotifyBody {
    #[must_use]
    pub fn new(chunk: Bytes, done: mpsc::Sender<()>) -> Self {
        Self {
            inner: Full::new(chunk),
            done: Some(done),
        }
    }

    fn notify(&mut self) {
        if let Some(done) = self.done.take() {
            let _ = done.try_send(());
        }
    }
}

impl Body for NotifyBody {
    type Data = Bytes;
    type Error = hyper::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, hyper::Error>>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_frame(cx) {
            Poll::Ready(Some(Ok(frame))) => {
                if this.inner.is_end_stream() {
                    this.notify();
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(Some(Err(never))) => match never {},
            Poll::Ready(None) => {
                this.notify();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
