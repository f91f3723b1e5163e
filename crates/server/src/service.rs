// Request handling seam shared by the server variants.

use core::fmt;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use http::StatusCode;

use crate::body::empty;
use crate::types::{HyperFuture, HyperRequest, HyperResponse, SharedHyperFunc};

/// What a caller-supplied hook is allowed to do, fixed at construction.
/// Replaces inspecting the callable at runtime: pick the capability at the
/// call site.
#[derive(Clone, Default)]
pub enum RequestHook {
    /// No hook; the built-in responder answers everything.
    #[default]
    Builtin,
    /// Sees every request; the built-in responder still answers.
    Observe(Arc<dyn Fn(&HyperRequest) + Send + Sync + 'static>),
    /// Full control over the response.
    Respond(SharedHyperFunc),
}

impl fmt::Debug for RequestHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Builtin => write!(f, "RequestHook::Builtin"),
            Self::Observe(_) => write!(f, "RequestHook::Observe(..)"),
            Self::Respond(_) => write!(f, "RequestHook::Respond(..)"),
        }
    }
}

/// `HookService` dispatches every request on one connection to the
/// configured hook.
pub struct HookService {
    peer: SocketAddr,
    hook: RequestHook,
}

// -- Constructors

impl HookService {
    #[must_use]
    pub fn new(peer: SocketAddr, hook: RequestHook) -> Self {
        Self { peer, hook }
    }
}

// -- Service implementation

impl hyper::service::Service<HyperRequest> for HookService {
    type Response = HyperResponse;
    type Error = crate::types::BoxedError;
    type Future = Pin<Box<HyperFuture>>;

    fn call(&self, request: HyperRequest) -> Self::Future {
        match &self.hook {
            RequestHook::Builtin => Box::pin(async move { Ok(not_found()) }),
            RequestHook::Observe(observer) => {
                observer(&request);
                Box::pin(async move { Ok(not_found()) })
            }
            RequestHook::Respond(handler) => handler(self.peer, request),
        }
    }
}

pub(crate) fn not_found() -> HyperResponse {
    hyper::Response::builder()
        .status(StatusCode::NOT_FOUND)
        .body(empty())
        .unwrap()
}
