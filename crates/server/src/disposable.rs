// One-shot server: serve the fixed payload, then drain connections and
// close itself.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use http::{header, StatusCode};
use http_body_util::BodyExt;
use tokio::sync::mpsc;

use crate::body::{empty, full, DisposablePayload, NotifyBody, ServerBody};
use crate::config::ServerConfig;
use crate::errors::{ConfigError, ServerError};
use crate::server::{BoundServer, HttpService};
use crate::service::RequestHook;
use crate::types::{HyperRequest, HyperResponse, JoinHandle, Result};

/// How long in-flight connections may keep running once the qualifying
/// response has finished, before they are force-destroyed.
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(5000);

pub const HTML_ROUTES: [&str; 2] = ["/", "/index.html"];
pub const BUNDLE_ROUTE: &str = "/bundle.js";

/// Where a disposable server is in its serve-once lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Serving,
    Finishing,
    Closed,
}

struct DisposableState {
    phase: Mutex<Phase>,
    payload: DisposablePayload,
    finished: mpsc::Sender<()>,
}

// -- Phase bookkeeping

impl DisposableState {
    fn phase(&self) -> Phase {
        *self.phase.lock().expect("should acquire phase lock")
    }

    fn set_phase(&self, phase: Phase) {
        *self.phase.lock().expect("should acquire phase lock") = phase;
    }
}

// -- Responses

impl DisposableState {
    /// With javascript configured the page is expected to come back for
    /// `/bundle.js`, so only the bundle response carries the finish signal.
    fn qualifying_is_bundle(&self) -> bool {
        self.payload.javascript().is_some()
    }

    fn qualifying_body(&self, chunk: Bytes) -> ServerBody {
        NotifyBody::new(chunk, self.finished.clone()).boxed()
    }

    fn html_response(&self) -> HyperResponse {
        let html = self.payload.html().clone();
        let body = if self.qualifying_is_bundle() {
            full(html.clone())
        } else {
            self.qualifying_body(html.clone())
        };
        payload_response(body, "text/html", html.len())
    }

    fn bundle_response(&self) -> HyperResponse {
        match self.payload.javascript() {
            Some(js) => {
                let js = js.clone();
                payload_response(self.qualifying_body(js.clone()), "text/javascript", js.len())
            }
            None => plain_status(StatusCode::NOT_FOUND),
        }
    }
}

fn route(state: &Arc<DisposableState>, path: &str) -> HyperResponse {
    if state.phase() != Phase::Serving {
        return plain_status(StatusCode::SERVICE_UNAVAILABLE);
    }
    if HTML_ROUTES.contains(&path) {
        return state.html_response();
    }
    if path == BUNDLE_ROUTE {
        return state.bundle_response();
    }
    plain_status(StatusCode::NOT_FOUND)
}

fn handle_request(
    state: Arc<DisposableState>,
    request: HyperRequest,
) -> std::pin::Pin<Box<crate::types::HyperFuture>> {
    Box::pin(async move {
        // Defer the response one scheduler tick instead of answering inside
        // the request callback itself.
        tokio::task::yield_now().await;
        Ok(route(&state, request.uri().path()))
    })
}

fn payload_response(body: ServerBody, content_type: &'static str, length: usize) -> HyperResponse {
    hyper::Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, length)
        .body(body)
        .unwrap()
}

fn plain_status(status: StatusCode) -> HyperResponse {
    hyper::Response::builder().status(status).body(empty()).unwrap()
}

/// Factory for a server that hands out one payload and then takes itself
/// down.
pub struct DisposableService {
    config: ServerConfig,
    payload: DisposablePayload,
}

// -- Constructors

impl DisposableService {
    pub fn new(
        config: ServerConfig,
        payload: DisposablePayload,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, payload })
    }
}

// -- Bind procedure

impl DisposableService {
    pub async fn bind(self) -> std::result::Result<DisposableHandle, ServerError> {
        let (finished, finish_watch) = mpsc::channel::<()>(2);
        let state = Arc::new(DisposableState {
            phase: Mutex::new(Phase::Serving),
            payload: self.payload,
            finished,
        });

        let hook_state = state.clone();
        let hook = RequestHook::Respond(Arc::new(move |_peer, request| {
            handle_request(hook_state.clone(), request)
        }));

        let server = HttpService::with_hook(self.config, hook)?.bind().await?;
        let local_addr = server.local_addr();
        let supervisor = spawn_supervisor(server, state.clone(), finish_watch);

        Ok(DisposableHandle {
            local_addr,
            state,
            supervisor,
        })
    }
}

fn spawn_supervisor(
    server: BoundServer,
    state: Arc<DisposableState>,
    mut finish_watch: mpsc::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if finish_watch.recv().await.is_none() {
            // Every finish sender is gone without a completed qualifying
            // response; nothing left to close.
            return Ok(());
        }

        state.set_phase(Phase::Finishing);
        perch_logs::info!(
            "Payload served; closing server at {}",
            server.local_addr()
        );

        server.shutdown(SHUTDOWN_GRACE).await?;

        state.set_phase(Phase::Closed);
        perch_logs::info!("Disposable server closed");
        Ok(())
    })
}

/// A live disposable server. Dropping the handle leaves the server to finish
/// its sequence on its own.
pub struct DisposableHandle {
    local_addr: SocketAddr,
    state: Arc<DisposableState>,
    supervisor: JoinHandle<()>,
}

impl DisposableHandle {
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// Resolves once the serve-once sequence has fully closed.
    pub async fn closed(self) -> Result<()> {
        self.supervisor.await?
    }
}
