//! Client configuration.

use std::{path::PathBuf, time::Duration};

use crate::cookie::DEFAULT_COOKIE_PATH;

/// Server address used when none is given.
pub const DEFAULT_HOST: &str = "localhost:6060";

/// API key of the stock Tinode server build.
pub const DEFAULT_API_KEY: &str = "AQEAAAABAAD_rAp4DJh05a1HAwFT3A6K";

/// How long the transport waits for the server to finish a close handshake.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Idle time before the prompt is redrawn.
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_millis(100);

/// Time the input thread gets to stop at shutdown.
pub const DEFAULT_INPUT_GRACE: Duration = Duration::from_millis(300);

/// Session loop configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Prompt shown while idle
    pub prompt: String,
    /// Quiet period after which the prompt is redrawn
    pub idle_interval: Duration,
    /// Grace period for the input thread at shutdown
    pub input_grace: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            prompt: "tn-cli> ".to_string(),
            idle_interval: DEFAULT_IDLE_INTERVAL,
            input_grace: DEFAULT_INPUT_GRACE,
        }
    }
}

/// Connection and session configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server `host:port`
    pub host: String,
    /// API key sent with the connection request
    pub api_key: String,
    /// Use TLS (`wss://`)
    pub secure: bool,
    /// Cookie file location
    pub cookie_path: PathBuf,
    /// Bound on the close handshake
    pub close_timeout: Duration,
    /// Session loop settings
    pub engine: EngineConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            secure: false,
            cookie_path: PathBuf::from(DEFAULT_COOKIE_PATH),
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            engine: EngineConfig::default(),
        }
    }
}

impl ClientConfig {
    /// WebSocket endpoint for this server.
    pub fn endpoint_url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{scheme}://{}/v0/channels?apikey={}", self.host, self.api_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_follows_security() {
        let mut config = ClientConfig { host: "chat.example.com".into(), api_key: "KEY".into(), ..ClientConfig::default() };
        assert_eq!(config.endpoint_url(), "ws://chat.example.com/v0/channels?apikey=KEY");

        config.secure = true;
        assert_eq!(config.endpoint_url(), "wss://chat.example.com/v0/channels?apikey=KEY");
    }

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.cookie_path, PathBuf::from(".tn-cli-cookie"));
        assert_eq!(config.close_timeout, Duration::from_secs(2));
        assert_eq!(config.engine.input_grace, Duration::from_millis(300));
    }
}
