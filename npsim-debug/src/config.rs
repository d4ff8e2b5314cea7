//! Configuration for a debug session.

use crate::error::{DebugError, Result};
use serde::Deserialize;
use std::time::Duration;

/// Environment variable overriding [`DebuggerConfig::endpoint`].
pub const ENV_ENDPOINT: &str = "NPSIM_DEBUG_ENDPOINT";
/// Environment variable overriding [`DebuggerConfig::poll_interval`], in milliseconds.
pub const ENV_POLL_MS: &str = "NPSIM_DEBUG_POLL_MS";

/// Maximum message size (16 MB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Debugger configuration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct DebuggerConfig {
    /// Well-known local endpoint the command server binds to.
    pub endpoint: String,

    /// How long the command thread waits for a request before checking
    /// whether it should shut down.
    #[serde(with = "millis")]
    pub poll_interval: Duration,

    /// Largest accepted request frame.
    pub max_message_size: usize,

    /// Name of the command server thread.
    pub server_thread_name: String,
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            endpoint: "127.0.0.1:5757".to_string(),
            poll_interval: Duration::from_millis(100),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            server_thread_name: "npsim-debug-server".to_string(),
        }
    }
}

impl DebuggerConfig {
    /// Default configuration with overrides from the environment.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(endpoint) = std::env::var(ENV_ENDPOINT) {
            config.endpoint = endpoint;
        }

        if let Ok(poll) = std::env::var(ENV_POLL_MS) {
            let millis = poll
                .parse::<u64>()
                .map_err(|e| DebugError::Config(format!("{ENV_POLL_MS}={poll}: {e}")))?;
            config.poll_interval = Duration::from_millis(millis);
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the receive poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the maximum frame size.
    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    /// Check the configuration for values the server cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(DebugError::Config("endpoint must not be empty".into()));
        }

        if self.poll_interval.is_zero() {
            return Err(DebugError::Config("poll_interval must be positive".into()));
        }

        if self.max_message_size == 0 {
            return Err(DebugError::Config(
                "max_message_size must be positive".into(),
            ));
        }

        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
