//! Relay server module
//!
//! Owns the listening socket and the accept loop. Each accepted connection is
//! handed to its own tunnel task; the loop never waits on tunnels. When the
//! shutdown token fires the listener is dropped and the drain begins.

use log::{debug, info};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::common::{RelayError, Result};
use crate::config::RelayConfig;
use super::events::{LogEvents, RelayEvents};
use super::handler::{handle_connection, TunnelContext};
use super::registry::TunnelRegistry;
use super::shutdown::{DrainOutcome, ShutdownCoordinator};

/// Pause after a failed accept so a persistent error (such as running out
/// of file descriptors) does not spin the loop
const ACCEPT_ERROR_PAUSE: Duration = Duration::from_millis(50);

/// Relay server
///
/// Accepts client connections and bridges each one to the configured
/// backend. Cloning is cheap; clones share the registry, the shutdown signal
/// and the event sink, so one clone can serve while another triggers
/// shutdown.
///
/// # Example
///
/// ```no_run
/// # use std::sync::Arc;
/// # use tcp_relay::{Relay, RelayConfig};
/// # #[tokio::main]
/// # async fn main() -> tcp_relay::Result<()> {
/// let relay = Relay::new(Arc::new(RelayConfig::default()));
/// let listener = relay.bind().await?;
///
/// let stopper = relay.clone();
/// tokio::spawn(async move {
///     let _ = tcp_relay::termination_signal().await;
///     stopper.shutdown();
/// });
///
/// relay.serve(listener).await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Relay {
    config: Arc<RelayConfig>,
    tunnels: Arc<TunnelContext>,
    coordinator: ShutdownCoordinator,
}

impl Relay {
    /// Create a relay that logs its events through `log`
    pub fn new(config: Arc<RelayConfig>) -> Self {
        Self::with_events(config, Arc::new(LogEvents))
    }

    /// Create a relay with a custom event sink
    pub fn with_events(config: Arc<RelayConfig>, events: Arc<dyn RelayEvents>) -> Self {
        Self::with_parts(config, events, TunnelRegistry::new())
    }

    /// Create a relay with a custom event sink and an externally owned registry
    pub fn with_parts(
        config: Arc<RelayConfig>,
        events: Arc<dyn RelayEvents>,
        registry: TunnelRegistry,
    ) -> Self {
        let token = CancellationToken::new();
        let tunnels = Arc::new(TunnelContext::new(
            &config,
            registry.clone(),
            Arc::clone(&events),
            token.clone(),
        ));
        let coordinator = ShutdownCoordinator::from_config(&config, token, registry, events);

        Self {
            config,
            tunnels,
            coordinator,
        }
    }

    /// Relay configuration
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Active tunnel registry
    pub fn registry(&self) -> &TunnelRegistry {
        &self.tunnels.registry
    }

    /// Shutdown coordinator
    pub fn coordinator(&self) -> &ShutdownCoordinator {
        &self.coordinator
    }

    /// Request shutdown; returns `false` if it was already requested
    pub fn shutdown(&self) -> bool {
        self.coordinator.trigger()
    }

    /// Bind the listening socket on the configured address
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Bind`] if the address cannot be bound. This is
    /// the one fatal error of the relay.
    pub async fn bind(&self) -> Result<TcpListener> {
        self.bind_to(self.config.listen).await
    }

    /// Bind the listening socket on `addr` instead of the configured address
    pub async fn bind_to(&self, addr: SocketAddr) -> Result<TcpListener> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| RelayError::Bind { addr, source })?;

        let local = listener.local_addr().unwrap_or(addr);
        self.tunnels.events.listener_ready(local, &self.config.target);
        Ok(listener)
    }

    /// Accept connections until shutdown, then drain
    ///
    /// Accept errors are logged and the loop keeps going after a short
    /// pause; only the shutdown signal stops it. Returns once the drain is clean or its deadline has
    /// passed.
    pub async fn serve(&self, listener: TcpListener) -> DrainOutcome {
        let token = self.coordinator.token().clone();

        loop {
            let accepted = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((client, client_addr)) => {
                    debug!("Accepted connection from {}", client_addr);
                    let ctx = Arc::clone(&self.tunnels);
                    tokio::spawn(handle_connection(client, client_addr, ctx));
                }
                Err(_) if token.is_cancelled() => break,
                Err(e) => {
                    self.tunnels.events.accept_failed(&e);
                    if !pause_after_accept_error(&token).await {
                        break;
                    }
                }
            }
        }

        // Closing the listener refuses new clients while tunnels drain.
        drop(listener);
        info!("Listener closed, waiting for {} active tunnels", self.registry().active());

        self.coordinator.drain().await
    }

    /// Bind on the configured address and serve until shutdown
    pub async fn run(&self) -> Result<DrainOutcome> {
        let listener = self.bind().await?;
        Ok(self.serve(listener).await)
    }
}

/// Wait out [`ACCEPT_ERROR_PAUSE`]; returns `false` if shutdown arrived first
async fn pause_after_accept_error(token: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(ACCEPT_ERROR_PAUSE) => true,
    }
}
