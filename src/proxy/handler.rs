//! Connection handler module
//!
//! Runs one tunnel from accept to close: dial the backend, count the tunnel
//! as active, forward, and report the outcome.

use log::debug;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use crate::common::{BufferPool, RelayError};
use crate::config::RelayConfig;
use super::dialer::Dialer;
use super::events::RelayEvents;
use super::forwarder::{forward, ForwardStats};
use super::registry::TunnelRegistry;
use super::tunnel::{Tunnel, TunnelState};

/// Everything a tunnel needs, shared by all tunnels of one relay
pub struct TunnelContext {
    /// Backend dialer
    pub dialer: Dialer,
    /// Copy buffer pool
    pub pool: BufferPool,
    /// Active tunnel counter
    pub registry: TunnelRegistry,
    /// Event sink
    pub events: Arc<dyn RelayEvents>,
    /// Shutdown signal
    pub shutdown: CancellationToken,
    /// Linger after the first direction finishes
    pub linger: Duration,
    next_id: AtomicU64,
}

impl TunnelContext {
    /// Build the shared tunnel context from the relay configuration
    pub fn new(
        config: &RelayConfig,
        registry: TunnelRegistry,
        events: Arc<dyn RelayEvents>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            dialer: Dialer::from_config(config),
            pool: BufferPool::new(config.buffer_size, config.max_idle_buffers),
            registry,
            events,
            shutdown,
            linger: config.linger(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate the next tunnel id
    pub fn next_tunnel_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

/// Handle a single client connection
///
/// Returns the forwarding statistics, or `None` when shutdown arrived before
/// the backend connection was established.
pub async fn handle_connection(
    client: TcpStream,
    client_addr: SocketAddr,
    ctx: Arc<TunnelContext>,
) -> Option<ForwardStats> {
    let mut tunnel = Tunnel::new(ctx.next_tunnel_id(), client_addr);
    let events = ctx.events.as_ref();

    let backend = match ctx.dialer.dial(tunnel.id(), &ctx.shutdown, events).await {
        Ok(backend) => backend,
        Err(e) => {
            // Dialing only gives up on shutdown; the client socket closes on return.
            debug_assert!(matches!(e, RelayError::Cancelled));
            tunnel.transition(TunnelState::Closed);
            events.dial_cancelled(tunnel.id());
            return None;
        }
    };

    let (guard, active) = ctx.registry.enter();
    tunnel.transition(TunnelState::Active);
    events.tunnel_started(tunnel.id(), client_addr, active);

    let stats = forward(&mut tunnel, client, backend, &ctx.pool, ctx.linger, events).await;

    tunnel.transition(TunnelState::Closed);
    drop(guard);
    events.tunnel_ended(tunnel.id(), ctx.registry.active());
    debug!("[tunnel {}] lived {:?}", tunnel.id(), tunnel.age());

    Some(stats)
}
