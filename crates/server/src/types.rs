// Types shared across the server factories.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync;

pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, BoxedError>;

pub type JoinHandle<T> = tokio::task::JoinHandle<Result<T>>;

pub type HyperRequest = hyper::Request<hyper::body::Incoming>;

pub type HyperResponse = hyper::Response<crate::body::ServerBody>;

pub type HyperFuture = dyn Future<Output = Result<HyperResponse>> + Send + 'static;

pub type HyperFunc =
    dyn Fn(SocketAddr, HyperRequest) -> Pin<Box<HyperFuture>> + Send + Sync + 'static;

pub type SharedHyperFunc = sync::Arc<HyperFunc>;
