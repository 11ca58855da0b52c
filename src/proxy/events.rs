//! Relay events
//!
//! The engine reports what it does through [`RelayEvents`] instead of
//! logging directly, so the sink can be swapped (tests record events,
//! the binary logs them).

use log::{debug, error, info, warn};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

/// Sink for the discrete events the relay emits
#[cfg_attr(test, mockall::automock)]
pub trait RelayEvents: Send + Sync {
    /// The listener is bound and accepting
    fn listener_ready(&self, listen: SocketAddr, target: &str);

    /// Accepting a connection failed while the relay is still running
    fn accept_failed(&self, error: &io::Error);

    /// A backend connect attempt failed; the next one follows after `backoff`
    fn dial_retry(&self, tunnel_id: u64, target: &str, error: &io::Error, backoff: Duration);

    /// Shutdown arrived while the tunnel was still dialing
    fn dial_cancelled(&self, tunnel_id: u64);

    /// A tunnel has a backend connection; `active` includes it
    fn tunnel_started(&self, tunnel_id: u64, client: SocketAddr, active: usize);

    /// The linger timer expired and the slower direction was cut off
    fn forced_close(&self, tunnel_id: u64, linger: Duration);

    /// A tunnel closed; `active` no longer includes it
    fn tunnel_ended(&self, tunnel_id: u64, active: usize);

    /// A termination request was received
    fn shutdown_started(&self);

    /// Every tunnel closed before the drain deadline
    fn drain_complete(&self);

    /// The drain deadline passed with tunnels still open
    fn drain_forced(&self, remaining: usize, waited: Duration);
}

/// Default sink that writes every event through the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEvents;

impl RelayEvents for LogEvents {
    fn listener_ready(&self, listen: SocketAddr, target: &str) {
        info!("Relay ready: {} -> {}", listen, target);
    }

    fn accept_failed(&self, error: &io::Error) {
        error!("Error accepting connection: {}", error);
    }

    fn dial_retry(&self, tunnel_id: u64, target: &str, error: &io::Error, backoff: Duration) {
        warn!("[tunnel {}] dial {} failed: {}; retry in {:?}", tunnel_id, target, error, backoff);
    }

    fn dial_cancelled(&self, tunnel_id: u64) {
        debug!("[tunnel {}] dial abandoned on shutdown", tunnel_id);
    }

    fn tunnel_started(&self, tunnel_id: u64, client: SocketAddr, active: usize) {
        info!("[tunnel {}] start from {} [{} active]", tunnel_id, client, active);
    }

    fn forced_close(&self, tunnel_id: u64, linger: Duration) {
        warn!("[tunnel {}] force close after {:?} linger", tunnel_id, linger);
    }

    fn tunnel_ended(&self, tunnel_id: u64, active: usize) {
        info!("[tunnel {}] end [{} active]", tunnel_id, active);
    }

    fn shutdown_started(&self) {
        info!("Shutting down...");
    }

    fn drain_complete(&self) {
        info!("All tunnels closed, exit");
    }

    fn drain_forced(&self, remaining: usize, waited: Duration) {
        warn!("Exit after {:?} grace period with {} tunnels still open", waited, remaining);
    }
}
