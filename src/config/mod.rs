//! Configuration module
//!
//! This module handles relay configuration: defaults, loading from a JSON
//! file and `TCP_RELAY_*` environment variables, merging sources by priority,
//! and validating the result.
//!
//! Priority, lowest to highest: defaults, configuration file, environment
//! variables, command line arguments.

mod defaults;
pub mod error;
mod loader;
mod merger;
mod validator;

pub use self::error::ConfigError;
pub use self::loader::ConfigLoader;
pub use self::merger::ConfigMerger;
pub use self::validator::ConfigValidator;
pub use defaults::{DEFAULT_CONFIG_FILE, ENV_PREFIX, LISTEN_STR, LOG_LEVEL_STR, TARGET_STR};

use serde::{Deserialize, Deserializer, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::common::parse_socket_addr;

/// Custom deserializer for socket addresses
fn deserialize_socket_addr<'de, D>(deserializer: D) -> std::result::Result<SocketAddr, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_socket_addr(&s).map_err(serde::de::Error::custom)
}

/// Relay configuration
///
/// Every field has a default, so a configuration file only needs to list
/// the values it changes. Durations are stored in milliseconds and exposed
/// as [`Duration`] through accessor methods.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
#[serde(default)]
pub struct RelayConfig {
    // --- Network settings ---

    /// Local address the relay listens on
    #[serde(default = "defaults::listen", deserialize_with = "deserialize_socket_addr")]
    pub listen: SocketAddr,

    /// Backend endpoint in `host:port` form, resolved on every dial attempt
    #[serde(default = "defaults::target")]
    pub target: String,

    // --- General settings ---

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "defaults::log_level")]
    pub log_level: String,

    /// Size of each copy buffer in bytes
    #[serde(default = "defaults::buffer_size")]
    pub buffer_size: usize,

    /// Idle copy buffers retained for reuse
    #[serde(default = "defaults::max_idle_buffers")]
    pub max_idle_buffers: usize,

    // --- Dialing ---

    /// Timeout for a single backend connect attempt
    #[serde(default = "defaults::connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Delay before the first retry
    #[serde(default = "defaults::backoff_initial_ms")]
    pub backoff_initial_ms: u64,

    /// Upper bound for the retry delay
    #[serde(default = "defaults::backoff_max_ms")]
    pub backoff_max_ms: u64,

    // --- Lifecycle ---

    /// How long the slower direction may keep running after the first EOF
    #[serde(default = "defaults::linger_ms")]
    pub linger_ms: u64,

    /// Overall deadline for draining tunnels on shutdown
    #[serde(default = "defaults::drain_timeout_ms")]
    pub drain_timeout_ms: u64,

    /// How often the drain checks the active tunnel count
    #[serde(default = "defaults::drain_poll_interval_ms")]
    pub drain_poll_interval_ms: u64,
}

impl Default for RelayConfig {
    #[inline]
    fn default() -> Self {
        Self {
            listen: defaults::listen(),
            target: defaults::target(),
            log_level: defaults::log_level(),
            buffer_size: defaults::buffer_size(),
            max_idle_buffers: defaults::max_idle_buffers(),
            connect_timeout_ms: defaults::connect_timeout_ms(),
            backoff_initial_ms: defaults::backoff_initial_ms(),
            backoff_max_ms: defaults::backoff_max_ms(),
            linger_ms: defaults::linger_ms(),
            drain_timeout_ms: defaults::drain_timeout_ms(),
            drain_poll_interval_ms: defaults::drain_poll_interval_ms(),
        }
    }
}

impl RelayConfig {
    /// Per-attempt backend connect timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// First retry delay
    pub fn backoff_initial(&self) -> Duration {
        Duration::from_millis(self.backoff_initial_ms)
    }

    /// Retry delay cap
    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }

    /// Linger period after the first direction reaches EOF
    pub fn linger(&self) -> Duration {
        Duration::from_millis(self.linger_ms)
    }

    /// Overall shutdown drain deadline
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    /// Drain poll interval
    pub fn drain_poll_interval(&self) -> Duration {
        Duration::from_millis(self.drain_poll_interval_ms)
    }
}

// Lets `merge` take either an owned config or a reference
impl AsRef<RelayConfig> for RelayConfig {
    #[inline]
    fn as_ref(&self) -> &RelayConfig {
        self
    }
}

/// Log the effective configuration
pub fn log_config(config: &RelayConfig) {
    use log::info;

    if !log::log_enabled!(log::Level::Info) {
        return;
    }

    info!("=== Relay Configuration ===");
    for line in config_summary(config) {
        info!("  {}", line);
    }
    info!("===========================");
}

/// One line per setting, as printed by [`log_config`]
fn config_summary(config: &RelayConfig) -> Vec<String> {
    vec![
        format!("Listen address: {}", config.listen),
        format!("Target address: {}", config.target),
        format!("Log level: {}", config.log_level),
        format!("Buffer size: {} bytes", config.buffer_size),
        format!("Max idle buffers: {}", config.max_idle_buffers),
        format!("Connect timeout: {:?}", config.connect_timeout()),
        format!("Backoff: {:?} doubling up to {:?}", config.backoff_initial(), config.backoff_max()),
        format!("Linger after EOF: {:?}", config.linger()),
        format!("Drain: {:?} (poll every {:?})", config.drain_timeout(), config.drain_poll_interval()),
    ]
}
