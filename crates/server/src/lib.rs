// Implements the core functionality to create, bind and dispose of small
// local HTTP servers: validated configuration, port hunting over a candidate
// range, connection tracking for forced teardown, and a disposable server
// that serves a fixed payload once and closes itself.

pub mod body;
pub mod config;
pub mod disposable;
pub mod errors;
pub mod hunt;
pub mod server;
pub mod service;
pub mod tracker;
pub mod types;

pub use body::{empty, full, DisposablePayload};
pub use config::{
    Http1Tuning, Http2Tuning, SecureConfig, ServerConfig, TlsCredentials, DEFAULT_ADDRESS,
    DEFAULT_SECURE_ADDRESS,
};
pub use disposable::{DisposableHandle, DisposableService, Phase, SHUTDOWN_GRACE};
pub use errors::{ConfigError, ServerError};
pub use hunt::{PortBinder, PortHunter, TcpBinder};
pub use server::{BoundServer, Http2Service, HttpService};
pub use service::RequestHook;
pub use tracker::ConnectionTable;
