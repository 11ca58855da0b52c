//! TCP Relay: byte-blind TCP forwarding to a single backend
//!
//! Accepts client connections on a local port and bridges each one to a fixed
//! backend endpoint, copying bytes in both directions until either side
//! closes. A backend that is temporarily unreachable is retried with capped
//! exponential backoff, and shutdown drains active tunnels for a bounded time.
//!
//! # Main Features
//!
//! - Protocol-agnostic forwarding with half-close propagation
//! - Indefinite backend retry (1s, 2s, 4s, ... capped at 30s by default)
//! - Bounded linger after the first direction reaches end-of-stream
//! - Graceful shutdown with a bounded drain
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tcp_relay::{Relay, RelayConfig, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = RelayConfig {
//!         listen: "127.0.0.1:9001".parse().unwrap(),
//!         target: "127.0.0.1:1521".to_string(),
//!         ..RelayConfig::default()
//!     };
//!
//!     let relay = Relay::new(Arc::new(config));
//!     relay.run().await?;
//!     Ok(())
//! }
//! ```

pub mod common;
pub mod config;
pub mod proxy;

// Re-export commonly used structures and functions for convenience
pub use common::{parse_socket_addr, RelayError, Result};
pub use config::RelayConfig;
pub use proxy::{termination_signal, DrainOutcome, Relay, RelayEvents, TunnelRegistry};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
