// Configuration for the server factories. Validation runs once, before any
// socket is opened.

use core::fmt;
use std::net::IpAddr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Default bind address for the plain and disposable servers.
pub const DEFAULT_ADDRESS: &str = "0.0.0.0";

/// Default bind address for the HTTP2 variant.
pub const DEFAULT_SECURE_ADDRESS: &str = "127.0.0.1";

/// `ServerConfig` describes where a server should land: the first candidate
/// port, the ceiling the hunt may walk up to, and the host to bind on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// First candidate port; 0 asks the platform for an ephemeral one.
    pub port: u16,
    /// Highest port the hunt may try. When below `port`, a single bind
    /// attempt is made.
    pub maxport: u16,
    /// Overrides `address` when present; may be a resolvable name.
    pub hostname: Option<String>,
    pub address: String,
    /// Open the default browser at the bound address, once.
    pub open: bool,
}

// -- Constructors

impl ServerConfig {
    #[must_use]
    pub fn new(port: u16) -> Self {
        Self {
            port,
            maxport: port,
            ..Self::default()
        }
    }

    /// Same shape with a `port..=maxport` hunting range.
    #[must_use]
    pub fn with_range(port: u16, maxport: u16) -> Self {
        Self {
            port,
            maxport,
            ..Self::default()
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 0,
            maxport: 0,
            hostname: None,
            address: DEFAULT_ADDRESS.to_string(),
            open: false,
        }
    }
}

// -- Debug Display

impl fmt::Display for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.bind_host(), self.port)
    }
}

// -- Methods

impl ServerConfig {
    /// Host the listeners bind on: `hostname` when supplied, `address`
    /// otherwise.
    #[must_use]
    pub fn bind_host(&self) -> &str {
        self.hostname.as_deref().unwrap_or(&self.address)
    }

    /// Fails fast on option shapes no bind attempt could act on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address.trim().is_empty() {
            return Err(ConfigError::EmptyAddress);
        }
        if self.address.parse::<IpAddr>().is_err() {
            return Err(ConfigError::InvalidAddress(self.address.clone()));
        }
        if let Some(hostname) = &self.hostname {
            if hostname.trim().is_empty() {
                return Err(ConfigError::InvalidHostname(hostname.clone()));
            }
        }
        Ok(())
    }
}

/// Knobs forwarded verbatim to hyper's http1 connection builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Http1Tuning {
    pub preserve_header_case: bool,
    pub title_case_headers: bool,
    pub half_close: bool,
    pub keep_alive: bool,
    pub max_buf_size: Option<usize>,
}

impl Default for Http1Tuning {
    fn default() -> Self {
        Self {
            preserve_header_case: true,
            title_case_headers: true,
            half_close: false,
            keep_alive: true,
            max_buf_size: None,
        }
    }
}

/// Knobs forwarded verbatim to hyper's http2 connection builder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Http2Tuning {
    pub max_concurrent_streams: Option<u32>,
    pub max_frame_size: Option<u32>,
    pub adaptive_window: bool,
}

/// Opaque credential material for an external TLS terminator. Carried, never
/// parsed.
#[derive(Debug, Clone, Default)]
pub struct TlsCredentials {
    pub pfx: Option<Bytes>,
    pub cert: Option<Bytes>,
    pub key: Option<Bytes>,
}

impl TlsCredentials {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pfx.is_none() && self.cert.is_none() && self.key.is_none()
    }
}

/// Configuration for the HTTP2 variant: the common server shape plus the
/// opaque credentials and http2 tuning.
#[derive(Debug, Clone)]
pub struct SecureConfig {
    pub server: ServerConfig,
    pub credentials: TlsCredentials,
    pub tuning: Http2Tuning,
}

// -- Constructors

impl SecureConfig {
    #[must_use]
    pub fn new(port: u16) -> Self {
        let mut server = ServerConfig::new(port);
        server.address = DEFAULT_SECURE_ADDRESS.to_string();
        Self {
            server,
            credentials: TlsCredentials::default(),
            tuning: Http2Tuning::default(),
        }
    }
}

impl Default for SecureConfig {
    fn default() -> Self {
        Self::new(0)
    }
}
