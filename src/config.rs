//! Host-supplied settings for a [`Bridge`](crate::Bridge).
//!
//! Hosts usually build a [`BridgeConfig`] in code. It also deserializes from
//! JSON, with every field optional:
//!
//! ```
//! use toolbridge::config::BridgeConfig;
//! use std::time::Duration;
//!
//! let config = BridgeConfig::from_json(r#"{"timeout_ms": 2500}"#).unwrap();
//! assert_eq!(config.timeout(), Duration::from_millis(2500));
//! assert_eq!(config.server_name, "toolbridge");
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Errors from loading or checking a [`BridgeConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("timeout_ms must be greater than zero")]
    ZeroTimeout,
    #[error("max_body_bytes must be greater than zero")]
    ZeroBodyLimit,
}

/// Settings shared by every request a bridge serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Wall-clock budget for a single handler, in milliseconds.
    pub timeout_ms: u64,
    /// Name reported in the MCP `initialize` result.
    pub server_name: String,
    /// Version reported in the MCP `initialize` result.
    pub server_version: String,
    /// Largest request body the reference listener accepts.
    pub max_body_bytes: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            timeout_ms: 10_000,
            server_name: "toolbridge".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl BridgeConfig {
    /// Parses and checks a JSON configuration document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed JSON or mistyped fields, otherwise
    /// whatever [`check`](BridgeConfig::check) reports.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = serde_json::from_str(text)?;
        config.check()?;
        Ok(config)
    }

    /// Rejects settings no request could be served with.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ZeroTimeout`] or [`ConfigError::ZeroBodyLimit`].
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::ZeroBodyLimit);
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Sets the handler budget, rounded up to whole milliseconds.
    ///
    /// Only a zero duration yields `timeout_ms == 0`, which
    /// [`check`](BridgeConfig::check) rejects.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_micros().div_ceil(1000)).unwrap_or(u64::MAX);
        self
    }
}
