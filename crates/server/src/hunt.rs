// Port hunting: sequential bind attempts walking a candidate port upward
// until one binds or the configured ceiling is passed.

use std::io;
use std::sync::Arc;

use tokio::net;

use crate::config::ServerConfig;
use crate::errors::ServerError;

/// The raw listen-on-port capability the hunt drives. Split out so the retry
/// protocol can be exercised against scripted bind outcomes.
#[async_trait::async_trait]
pub trait PortBinder: Send + Sync {
    async fn bind(&self, host: &str, port: u16) -> io::Result<net::TcpListener>;
}

/// Binds real TCP listeners through tokio.
#[derive(Debug, Default)]
pub struct TcpBinder;

#[async_trait::async_trait]
impl PortBinder for TcpBinder {
    async fn bind(&self, host: &str, port: u16) -> io::Result<net::TcpListener> {
        net::TcpListener::bind((host, port)).await
    }
}

/// One traversal of the configured port range. Attempts are strictly
/// sequential; a failed candidate releases its listener before the next
/// attempt starts.
pub struct PortHunter<'a> {
    config: &'a ServerConfig,
    binder: Arc<dyn PortBinder>,
}

// -- Constructors

impl<'a> PortHunter<'a> {
    #[must_use]
    pub fn new(config: &'a ServerConfig) -> Self {
        Self::with_binder(config, Arc::new(TcpBinder))
    }

    #[must_use]
    pub fn with_binder(config: &'a ServerConfig, binder: Arc<dyn PortBinder>) -> Self {
        Self { config, binder }
    }
}

// -- Implementation details

impl PortHunter<'_> {
    /// Walks candidate ports upward on address-in-use, one port at a time
    /// with no delay in between. Any other bind failure, or address-in-use
    /// past the ceiling, is returned untouched.
    pub async fn acquire(&self) -> Result<net::TcpListener, ServerError> {
        let host = self.config.bind_host();
        let mut candidate = self.config.port;

        if self.config.maxport < self.config.port {
            perch_logs::warn!(
                "maxport {} is below port {}; making a single bind attempt",
                self.config.maxport,
                self.config.port
            );
        }

        loop {
            match self.binder.bind(host, candidate).await {
                Ok(listener) => {
                    perch_logs::info!(
                        "Created TCPListener for {}",
                        listener
                            .local_addr()
                            .expect("listener should have local address")
                    );
                    return Ok(listener);
                }
                Err(err)
                    if err.kind() == io::ErrorKind::AddrInUse
                        && candidate < self.config.maxport =>
                {
                    perch_logs::info!(
                        "Port {} on {} already taken, hunting {}",
                        candidate,
                        host,
                        candidate + 1
                    );
                    candidate += 1;
                }
                Err(err) => return Err(ServerError::Bind(err)),
            }
        }
    }
}
