use derive_more::From;

// -- Errors

/// Raised before any socket is opened when the supplied options do not hold
/// together. Never retried.
#[derive(Debug)]
pub enum ConfigError {
    EmptyAddress,
    InvalidAddress(String),
    InvalidHostname(String),
}

impl std::error::Error for ConfigError {}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, From)]
pub enum ServerError {
    Config(ConfigError),
    /// Bind failure after the hunt has run its course, carrying the
    /// underlying error untouched.
    Bind(std::io::Error),
}

impl std::error::Error for ServerError {}

impl core::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}
