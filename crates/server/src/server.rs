// Server factories and the bound-server lifecycle: hunt a port, accept and
// track connections, tear everything down on request.

use std::net::SocketAddr;
use std::time::Duration;

use hyper::server::conn::{http1, http2};
use hyper_util::rt::{TokioExecutor, TokioIo};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, oneshot};

use crate::config::{Http1Tuning, Http2Tuning, SecureConfig, ServerConfig};
use crate::errors::{ConfigError, ServerError};
use crate::hunt::PortHunter;
use crate::service::{HookService, RequestHook};
use crate::tracker::ConnectionTable;
use crate::types::{JoinHandle, Result};

/// Factory for a plain HTTP1 server. Validation happens here, before any
/// socket is opened.
#[derive(Debug)]
pub struct HttpService {
    config: ServerConfig,
    tuning: Http1Tuning,
    hook: RequestHook,
}

// -- Constructors

impl HttpService {
    pub fn new(config: ServerConfig) -> std::result::Result<Self, ConfigError> {
        Self::with_hook(config, RequestHook::Builtin)
    }

    pub fn with_hook(
        config: ServerConfig,
        hook: RequestHook,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            tuning: Http1Tuning::default(),
            hook,
        })
    }

    #[must_use]
    pub fn tuned(mut self, tuning: Http1Tuning) -> Self {
        self.tuning = tuning;
        self
    }
}

// -- Bind procedure

impl HttpService {
    /// Hunts a port and starts accepting. Returns exactly one bound server
    /// on success; every failure is returned, never delivered half-way.
    pub async fn bind(self) -> std::result::Result<BoundServer, ServerError> {
        let listener = PortHunter::new(&self.config).acquire().await?;
        BoundServer::start(
            listener,
            &self.config,
            ServeProtocol::Http1(self.tuning),
            self.hook,
        )
    }
}

/// Factory for the HTTP2 variant: same hunting and tracking machinery,
/// cleartext h2, loopback by default. Credential buffers ride along for an
/// external TLS terminator.
pub struct Http2Service {
    config: SecureConfig,
    hook: RequestHook,
}

// -- Constructors

impl Http2Service {
    pub fn new(config: SecureConfig) -> std::result::Result<Self, ConfigError> {
        Self::with_hook(config, RequestHook::Builtin)
    }

    pub fn with_hook(
        config: SecureConfig,
        hook: RequestHook,
    ) -> std::result::Result<Self, ConfigError> {
        config.server.validate()?;
        Ok(Self { config, hook })
    }
}

// -- Bind procedure

impl Http2Service {
    pub async fn bind(self) -> std::result::Result<BoundServer, ServerError> {
        if !self.config.credentials.is_empty() {
            perch_logs::info!("Carrying TLS credentials for an external terminator");
        }
        let listener = PortHunter::new(&self.config.server).acquire().await?;
        BoundServer::start(
            listener,
            &self.config.server,
            ServeProtocol::Http2(self.config.tuning),
            self.hook,
        )
    }
}

#[derive(Debug, Clone)]
enum ServeProtocol {
    Http1(Http1Tuning),
    Http2(Http2Tuning),
}

/// A live, bound server: the accept loop runs until `close` is called or the
/// listener dies. Connections are tracked for forced teardown.
#[derive(Debug)]
pub struct BoundServer {
    local_addr: SocketAddr,
    connections: ConnectionTable,
    shutdown: broadcast::Sender<()>,
    accept_loop: JoinHandle<()>,
}

// -- Startup

impl BoundServer {
    fn start(
        listener: TcpListener,
        config: &ServerConfig,
        protocol: ServeProtocol,
        hook: RequestHook,
    ) -> std::result::Result<Self, ServerError> {
        let local_addr = listener.local_addr().map_err(ServerError::Bind)?;
        let connections = ConnectionTable::new();
        let (shutdown, _) = broadcast::channel::<()>(2);

        let accept_loop = spawn_accept_loop(
            listener,
            protocol,
            hook,
            connections.clone(),
            shutdown.subscribe(),
        );

        perch_logs::info!("Listening on http://{}", local_addr);

        if config.open {
            open_browser(local_addr);
        }

        Ok(Self {
            local_addr,
            connections,
            shutdown,
            accept_loop,
        })
    }
}

// -- Getters

impl BoundServer {
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of transport connections currently tracked.
    #[must_use]
    pub fn connections(&self) -> usize {
        self.connections.len()
    }
}

// -- Lifecycle

impl BoundServer {
    /// Stops accepting new connections and releases the listener. In-flight
    /// exchanges keep running.
    pub fn close(&self) {
        let _ = self.shutdown.send(());
    }

    /// Closes the listener, lets in-flight connections drain for up to
    /// `grace`, then force-destroys whatever remains.
    pub async fn shutdown(self, grace: Duration) -> Result<()> {
        self.close();

        let drained = tokio::time::timeout(grace, async {
            while !self.connections.is_empty() {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await;

        if drained.is_err() {
            let destroyed = self.connections.destroy_all();
            perch_logs::warn!(
                "Destroyed {} connections still lingering after the grace period",
                destroyed
            );
        }

        self.accept_loop.await?
    }

    /// Waits for the accept loop to end on its own.
    pub async fn wait(self) -> Result<()> {
        self.accept_loop.await?
    }
}

fn spawn_accept_loop(
    listener: TcpListener,
    protocol: ServeProtocol,
    hook: RequestHook,
    connections: ConnectionTable,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            res = async {
                loop {
                    match listener.accept().await {
                        Ok((stream, peer)) => {
                            serve_connection(
                                stream,
                                peer,
                                protocol.clone(),
                                hook.clone(),
                                &connections,
                            );
                        }
                        Err(err) => {
                            perch_logs::error!(
                                "Failed to get new client connection {:?}",
                                err,
                            );
                            break;
                        }
                    }
                }
                Ok(())
            } => {
                res
            }

            _ = shutdown.recv() => {
                perch_logs::info!("Stopped accepting new connections");
                Ok(())
            }
        }
    })
}

fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    protocol: ServeProtocol,
    hook: RequestHook,
    connections: &ConnectionTable,
) {
    let table = connections.clone();
    // The task must not finish before it is tracked, or it could never
    // untrack itself.
    let (tracked_alert, tracked) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        let _ = tracked.await;

        let io = TokioIo::new(stream);
        let service = HookService::new(peer, hook);
        let served = match protocol {
            ServeProtocol::Http1(tuning) => {
                let mut builder = http1::Builder::new();
                builder
                    .preserve_header_case(tuning.preserve_header_case)
                    .title_case_headers(tuning.title_case_headers)
                    .half_close(tuning.half_close)
                    .keep_alive(tuning.keep_alive);
                if let Some(max) = tuning.max_buf_size {
                    builder.max_buf_size(max);
                }
                builder.serve_connection(io, service).await
            }
            ServeProtocol::Http2(tuning) => {
                let mut builder = http2::Builder::new(TokioExecutor::new());
                builder
                    .max_concurrent_streams(tuning.max_concurrent_streams)
                    .adaptive_window(tuning.adaptive_window);
                if let Some(size) = tuning.max_frame_size {
                    builder.max_frame_size(size);
                }
                builder.serve_connection(io, service).await
            }
        };

        if let Err(err) = served {
            perch_logs::error!("Failed to serve connection from {}: {:?}", peer, err);
        }
        table.release(&peer);
    });

    connections.track(peer, handle.abort_handle());
    let _ = tracked_alert.send(());
}

fn open_browser(addr: SocketAddr) {
    let url = format!("http://{addr}");
    // Fire and forget; some platforms block in open::that.
    tokio::task::spawn_blocking(move || {
        if let Err(err) = open::that(&url) {
            perch_logs::error!("Failed to open browser at {}: {:?}", url, err);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::HttpService;
    use crate::config::ServerConfig;
    use crate::errors::ConfigError;
    use std::time::Duration;

    #[test]
    fn should_fail_fast_on_invalid_config() {
        let mut config = ServerConfig::new(0);
        config.address = String::from("nonsense");

        let err = HttpService::new(config).expect_err("should have rejected config");
        assert!(matches!(err, ConfigError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn should_bind_ephemeral_port_for_port_zero() {
        let mut config = ServerConfig::new(0);
        config.address = String::from("127.0.0.1");

        let server = HttpService::new(config)
            .expect("should have built service")
            .bind()
            .await
            .expect("should have bound");

        assert!(server.local_addr().port() > 0);
        server
            .shutdown(Duration::from_millis(100))
            .await
            .expect("should have shut down");
    }
}
