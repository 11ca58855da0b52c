//! Graceful shutdown
//!
//! A termination request sets the shared shutdown token. The accept loop
//! sees it and drops the listener; tunnels still dialing give up. Tunnels
//! that are already forwarding keep running, and the coordinator waits for
//! the active count to reach zero, but never past the drain deadline.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::RelayConfig;
use super::events::RelayEvents;
use super::registry::TunnelRegistry;

/// How the shutdown drain ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every tunnel closed before the deadline
    Clean,
    /// The deadline passed with tunnels still open
    Forced {
        /// Tunnels still active at the deadline
        remaining: usize,
    },
}

/// Wait for a termination request (SIGINT or SIGTERM; Ctrl-C off Unix)
pub async fn termination_signal() -> io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}

/// Owns the shutdown signal and the drain wait
#[derive(Clone)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    triggered: Arc<AtomicBool>,
    registry: TunnelRegistry,
    events: Arc<dyn RelayEvents>,
    drain_timeout: Duration,
    poll_interval: Duration,
}

impl ShutdownCoordinator {
    /// Create a coordinator
    pub fn new(
        token: CancellationToken,
        registry: TunnelRegistry,
        events: Arc<dyn RelayEvents>,
        drain_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            token,
            triggered: Arc::new(AtomicBool::new(false)),
            registry,
            events,
            drain_timeout,
            poll_interval,
        }
    }

    /// Create a coordinator with the drain timings from the configuration
    pub fn from_config(
        config: &RelayConfig,
        token: CancellationToken,
        registry: TunnelRegistry,
        events: Arc<dyn RelayEvents>,
    ) -> Self {
        Self::new(token, registry, events, config.drain_timeout(), config.drain_poll_interval())
    }

    /// The shutdown token observed by the accept loop and the dialers
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Whether shutdown has been requested
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Set the shutdown signal
    ///
    /// Only the first call has an effect; returns whether this call was it.
    pub fn trigger(&self) -> bool {
        if self.triggered.swap(true, Ordering::SeqCst) {
            return false;
        }

        self.events.shutdown_started();
        self.token.cancel();
        true
    }

    /// Wait for the active tunnel count to drop to zero, polling at the
    /// configured interval, for at most the drain timeout
    pub async fn drain(&self) -> DrainOutcome {
        let started = Instant::now();
        let deadline = sleep(self.drain_timeout);
        tokio::pin!(deadline);

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = ticker.tick() => {
                    if self.registry.active() == 0 {
                        self.events.drain_complete();
                        return DrainOutcome::Clean;
                    }
                }
                _ = &mut deadline => {
                    let remaining = self.registry.active();
                    if remaining == 0 {
                        self.events.drain_complete();
                        return DrainOutcome::Clean;
                    }
                    self.events.drain_forced(remaining, started.elapsed());
                    return DrainOutcome::Forced { remaining };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::events::MockRelayEvents;

    fn coordinator(registry: &TunnelRegistry, events: MockRelayEvents) -> ShutdownCoordinator {
        ShutdownCoordinator::new(
            CancellationToken::new(),
            registry.clone(),
            Arc::new(events),
            Duration::from_secs(5),
            Duration::from_millis(500),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_with_no_tunnels_is_immediate() {
        let registry = TunnelRegistry::new();
        let mut events = MockRelayEvents::new();
        events.expect_drain_complete().times(1).returning(|| ());

        let started = Instant::now();
        let outcome = coordinator(&registry, events).drain().await;

        assert_eq!(outcome, DrainOutcome::Clean);
        assert!(started.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_waits_for_tunnels_to_close() {
        let registry = TunnelRegistry::new();
        let (guard, _) = registry.enter();

        let mut events = MockRelayEvents::new();
        events.expect_drain_complete().times(1).returning(|| ());

        tokio::spawn(async move {
            sleep(Duration::from_millis(1200)).await;
            drop(guard);
        });

        let started = Instant::now();
        let outcome = coordinator(&registry, events).drain().await;

        assert_eq!(outcome, DrainOutcome::Clean);
        // Noticed on the next 500ms poll after the tunnel closed
        assert_eq!(started.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_gives_up_at_deadline() {
        let registry = TunnelRegistry::new();
        let (_guard, _) = registry.enter();
        let (_other, _) = registry.enter();

        let mut events = MockRelayEvents::new();
        events
            .expect_drain_forced()
            .withf(|remaining, waited| *remaining == 2 && *waited == Duration::from_secs(5))
            .times(1)
            .returning(|_, _| ());

        let started = Instant::now();
        let outcome = coordinator(&registry, events).drain().await;

        assert_eq!(outcome, DrainOutcome::Forced { remaining: 2 });
        assert_eq!(started.elapsed(), Duration::from_secs(5));
    }

    #[test]
    fn test_trigger_only_once() {
        let registry = TunnelRegistry::new();
        let mut events = MockRelayEvents::new();
        events.expect_shutdown_started().times(1).returning(|| ());

        let coordinator = coordinator(&registry, events);
        assert!(!coordinator.is_shutting_down());
        assert!(coordinator.trigger());
        assert!(!coordinator.trigger());
        assert!(coordinator.is_shutting_down());
        assert!(coordinator.token().is_cancelled());
    }
}
