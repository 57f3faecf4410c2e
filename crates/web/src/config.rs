//! Server configuration.
//!
//! Every field has a default, so a TOML file only needs the keys it changes:
//!
//! ```toml
//! address = "0.0.0.0:80"
//! message_limit = 4194304
//! ws_mode = "raw"
//! origins = ["example.com"]
//! ```

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// How WebSocket text messages reach the application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WsMode {
    /// Text messages are JSON `{"event": ..., "data": ...}` objects dispatched by event name.
    #[default]
    Advanced,
    /// Every message is handed over as is.
    Raw,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub address: String,
    /// Largest WebSocket message and largest form body, in bytes.
    pub message_limit: usize,
    pub ws_mode: WsMode,
    /// Seconds a session lives without a request renewing it.
    pub session_timeout: u64,
    /// Seconds of WebSocket inactivity before the server pings the client.
    pub keep_alive: u64,
    /// The transport below is TLS, protocols are reported as `https`/`wss`.
    pub secure: bool,
    /// Accepted WebSocket origins, empty or `*` accepts any.
    pub origins: Vec<String>,
    /// Session cookie domain, the request host when unset.
    pub domain: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8080".to_string(),
            message_limit: 1024 * 1024,
            ws_mode: WsMode::Advanced,
            session_timeout: 3600,
            keep_alive: 25,
            secure: false,
            origins: Vec::new(),
            domain: None,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("can't read config file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid config: {source}")]
    Parse {
        #[from]
        source: toml::de::Error,
    },

    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("can't resolve address {address}: {source}")]
    Address { address: String, source: io::Error },
}

impl ConfigError {
    fn invalid<S: ToString>(field: &'static str, reason: S) -> Self {
        Self::Invalid { field, reason: reason.to_string() }
    }
}

impl ServerConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.message_limit == 0 {
            return Err(ConfigError::invalid("message_limit", "must be greater than 0"));
        }
        if self.session_timeout == 0 {
            return Err(ConfigError::invalid("session_timeout", "must be greater than 0"));
        }
        if self.keep_alive == 0 {
            return Err(ConfigError::invalid("keep_alive", "must be greater than 0"));
        }
        if self.address.trim().is_empty() {
            return Err(ConfigError::invalid("address", "must not be empty"));
        }
        Ok(())
    }

    pub fn socket_addrs(&self) -> Result<Vec<SocketAddr>, ConfigError> {
        let address_error = |source| ConfigError::Address { address: self.address.clone(), source };
        let addrs = self.address.to_socket_addrs().map_err(address_error)?.collect::<Vec<_>>();
        if addrs.is_empty() {
            return Err(address_error(io::Error::new(io::ErrorKind::NotFound, "no address resolved")));
        }
        Ok(addrs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_timeout)
    }

    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_secs(self.keep_alive)
    }
}
