// Plain and HTTP2 server behavior over real sockets.

use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use http_body_util::BodyExt;
use hyper_util::rt::{TokioExecutor, TokioIo};
use perch::types::{HyperFuture, HyperRequest};
use perch::{Http2Service, HttpService, RequestHook, SecureConfig, ServerConfig};

use crate::support;

fn local_config() -> ServerConfig {
    let mut config = ServerConfig::new(0);
    config.address = String::from("127.0.0.1");
    config
}

#[tokio::test]
async fn should_answer_unknown_paths_with_builtin_responder() {
    let server = HttpService::new(local_config())
        .expect("should have built service")
        .bind()
        .await
        .expect("should have bound");

    let response = support::get(server.local_addr(), "/anything")
        .await
        .expect("should have been answered");
    assert_eq!(response.status, 404);

    server
        .shutdown(Duration::from_millis(200))
        .await
        .expect("should have shut down");
}

#[tokio::test]
async fn should_let_observers_see_requests() {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    let hook = RequestHook::Observe(Arc::new(move |_request| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    let server = HttpService::with_hook(local_config(), hook)
        .expect("should have built service")
        .bind()
        .await
        .expect("should have bound");

    support::get(server.local_addr(), "/")
        .await
        .expect("should have been answered");
    assert_eq!(seen.load(Ordering::SeqCst), 1);

    server
        .shutdown(Duration::from_millis(200))
        .await
        .expect("should have shut down");
}

fn hello_handler(_peer: SocketAddr, _request: HyperRequest) -> Pin<Box<HyperFuture>> {
    Box::pin(async move {
        Ok(hyper::Response::builder()
            .status(http::StatusCode::OK)
            .body(perch::full("hello over h2"))
            .unwrap())
    })
}

#[tokio::test]
async fn should_serve_cleartext_http2_with_custom_responder() {
    let server = Http2Service::with_hook(SecureConfig::new(0), RequestHook::Respond(Arc::new(hello_handler)))
        .expect("should have built service")
        .bind()
        .await
        .expect("should have bound");

    let stream = tokio::net::TcpStream::connect(server.local_addr())
        .await
        .expect("should have connected");
    let (mut sender, connection) =
        hyper::client::conn::http2::handshake(TokioExecutor::new(), TokioIo::new(stream))
            .await
            .expect("should have completed the h2 handshake");
    tokio::spawn(connection);

    let request = hyper::Request::builder()
        .uri("/")
        .body(http_body_util::Empty::<bytes::Bytes>::new())
        .expect("should have built request");
    let response = sender
        .send_request(request)
        .await
        .expect("should have sent request");

    assert_eq!(response.status(), 200);
    let body = response
        .into_body()
        .collect()
        .await
        .expect("should have collected body")
        .to_bytes();
    assert_eq!(body.as_ref(), b"hello over h2");

    server
        .shutdown(Duration::from_millis(200))
        .await
        .expect("should have shut down");
}

#[tokio::test]
async fn should_track_and_drain_connections() {
    let server = HttpService::new(local_config())
        .expect("should have built service")
        .bind()
        .await
        .expect("should have bound");
    let addr = server.local_addr();

    let mut session = support::Session::connect(addr)
        .await
        .expect("should have connected");
    session.get("/").await.expect("should have been answered");
    assert_eq!(server.connections(), 1);

    drop(session);
    server
        .shutdown(Duration::from_secs(2))
        .await
        .expect("should have drained and shut down");
}
