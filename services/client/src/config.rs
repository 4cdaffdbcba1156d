//! Client connection policy configuration.

use formlink_types::{FormError, TransportError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Connection and recovery policy for the client binding.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Reconnect attempts before recovery gives up (sticky failure).
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,
    /// Fixed delay between reconnect attempts, in milliseconds.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

fn default_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_delay_ms() -> u64 {
    500
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            reconnect_attempts: default_reconnect_attempts(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

impl ClientConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, FormError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            FormError::Transport(TransportError::Io(format!(
                "failed to read config file: {e}"
            )))
        })?;
        toml::from_str(&contents).map_err(|e| {
            FormError::InvalidArgument(format!("failed to parse client config: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.reconnect_attempts, 5);
        assert_eq!(config.reconnect_delay(), Duration::from_millis(500));
    }

    #[test]
    fn parses_partial_toml() {
        let config: ClientConfig = toml::from_str("reconnect_attempts = 3").unwrap();
        assert_eq!(config.reconnect_attempts, 3);
        assert_eq!(config.reconnect_delay_ms, 500);
    }
}
