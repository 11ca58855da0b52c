//! Default configuration values
//!
//! Single source of truth for defaults, shared by serde, the loader and the
//! merger (which treats "equal to default" as "not set").

use std::net::SocketAddr;
use std::str::FromStr;

/// Environment variable prefix for all configuration options
pub const ENV_PREFIX: &str = "TCP_RELAY_";

/// Configuration file picked up from the working directory when present
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Default listen address as string
pub const LISTEN_STR: &str = "0.0.0.0:9001";

/// Default backend target
pub const TARGET_STR: &str = "127.0.0.1:1521";

/// Default log level as string
pub const LOG_LEVEL_STR: &str = "info";

/// Default listen address
pub fn listen() -> SocketAddr {
    SocketAddr::from_str(LISTEN_STR)
        .expect("Default listen address should be valid")
}

/// Default backend target
pub fn target() -> String {
    TARGET_STR.to_string()
}

/// Default log level
pub fn log_level() -> String {
    LOG_LEVEL_STR.to_string()
}

/// Default copy buffer size (64 KiB)
pub fn buffer_size() -> usize {
    64 * 1024
}

/// Default per-attempt connect timeout
pub fn connect_timeout_ms() -> u64 {
    3_000
}

/// Default first retry delay
pub fn backoff_initial_ms() -> u64 {
    1_000
}

/// Default retry delay cap
pub fn backoff_max_ms() -> u64 {
    30_000
}

/// Default linger after the first direction finishes
pub fn linger_ms() -> u64 {
    5_000
}

/// Default overall shutdown drain deadline
pub fn drain_timeout_ms() -> u64 {
    5_000
}

/// Default drain poll interval
pub fn drain_poll_interval_ms() -> u64 {
    500
}

/// Default number of idle copy buffers kept for reuse
pub fn max_idle_buffers() -> usize {
    256
}
