//! Server configuration.
//!
//! Sources, lowest priority first:
//!
//! | Source | Keys |
//! |--------|------|
//! | defaults | `127.0.0.1:49537`, level `info` |
//! | env file (`NSMOCK_ENV_FILE`, default `.env`) | same as environment |
//! | environment | `NSMOCK_HOST`, `NSMOCK_PORT`, `NSMOCK_LOG_LEVEL` |
//! | command line | `--ip/-i`, `--port/-p` |
//!
//! The host may be an IP address or a name to resolve. Port `0` asks the OS
//! for a free port.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use tokio::net::lookup_host;
use tracing::Level;

use crate::cli::CliOverrides;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 49537;
pub const DEFAULT_ENV_FILE: &str = ".env";

pub const ENV_HOST: &str = "NSMOCK_HOST";
pub const ENV_PORT: &str = "NSMOCK_PORT";
pub const ENV_LOG_LEVEL: &str = "NSMOCK_LOG_LEVEL";
pub const ENV_FILE: &str = "NSMOCK_ENV_FILE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: Level,
    /// Env file that was loaded, if any.
    pub config_source: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log_level: Level::INFO,
            config_source: None,
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup(ENV_HOST).filter(|s| !s.trim().is_empty()) {
            config.host = host.trim().to_string();
        }
        if let Some(port) = lookup(ENV_PORT).filter(|s| !s.trim().is_empty()) {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| format!("{} must be a valid port number, got '{}'", ENV_PORT, port))?;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|s| !s.trim().is_empty()) {
            config.log_level = Level::from_str(level.trim())
                .map_err(|_| format!("{} must be one of trace, debug, info, warn, error", ENV_LOG_LEVEL))?;
        }
        Ok(config)
    }

    /// Applies command line overrides.
    pub fn with_overrides(mut self, overrides: &CliOverrides) -> Self {
        if let Some(host) = &overrides.host {
            self.host = host.clone();
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("Host cannot be empty".to_string());
        }
        if self.host.chars().any(char::is_whitespace) {
            return Err(format!("Invalid host: '{}'", self.host));
        }
        Ok(())
    }

    /// Resolves `host:port` to the address to bind. Host names such as
    /// `localhost` are looked up; the first result is used.
    pub async fn resolve(&self) -> Result<SocketAddr, String> {
        let mut addrs = lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| format!("Cannot resolve {}:{}: {}", self.host, self.port, e))?;
        addrs
            .next()
            .ok_or_else(|| format!("No address found for {}:{}", self.host, self.port))
    }
}

/// Loads the env file named by `NSMOCK_ENV_FILE` (default `.env`). A
/// missing file is not an error. Returns the loaded path.
pub fn load_env_file() -> Result<Option<String>, String> {
    let env_file = env::var(ENV_FILE).unwrap_or_else(|_| DEFAULT_ENV_FILE.to_string());
    match dotenvy::from_filename(&env_file) {
        Ok(path) => Ok(Some(path.display().to_string())),
        Err(dotenvy::Error::Io(_)) => Ok(None),
        Err(e) => Err(format!("Failed to load {}: {}", env_file, e)),
    }
}
