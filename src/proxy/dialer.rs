//! Backend dialing with retry
//!
//! Each attempt is bounded by the connect timeout. Failed attempts are
//! followed by an exponential backoff wait (1s, 2s, 4s, ... capped at 30s
//! with the defaults). There is no attempt limit: the relay keeps trying for
//! as long as it runs, and only shutdown ends the loop early.

use std::io;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

use crate::common::{RelayError, Result};
use crate::config::RelayConfig;
use super::events::RelayEvents;

/// Capped exponential backoff
///
/// Yields the initial delay first, doubling after every call until the cap
/// is reached; from then on it yields the cap forever.
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    max: Duration,
}

impl Backoff {
    /// Create a backoff starting at `initial` and saturating at `max`
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self { current: initial.min(max), max }
    }

    /// Delay to wait before the next attempt
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self
            .current
            .checked_mul(2)
            .map_or(self.max, |doubled| doubled.min(self.max));
        delay
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        Some(self.next_delay())
    }
}

/// Connects to the backend, retrying until success or shutdown
#[derive(Debug, Clone)]
pub struct Dialer {
    target: String,
    connect_timeout: Duration,
    backoff_initial: Duration,
    backoff_max: Duration,
}

impl Dialer {
    /// Create a dialer for `target` (`host:port`)
    pub fn new(
        target: impl Into<String>,
        connect_timeout: Duration,
        backoff_initial: Duration,
        backoff_max: Duration,
    ) -> Self {
        Self {
            target: target.into(),
            connect_timeout,
            backoff_initial,
            backoff_max,
        }
    }

    /// Create a dialer from the relay configuration
    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(
            config.target.clone(),
            config.connect_timeout(),
            config.backoff_initial(),
            config.backoff_max(),
        )
    }

    /// A single connect attempt bounded by the connect timeout
    pub async fn connect_once(&self) -> io::Result<TcpStream> {
        match timeout(self.connect_timeout, TcpStream::connect(self.target.as_str())).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connect timed out after {:?}", self.connect_timeout),
            )),
        }
    }

    /// Connect to the backend, retrying with backoff
    ///
    /// Returns [`RelayError::Cancelled`] once `cancel` fires, whether that
    /// happens during a connect attempt or during a backoff wait. No backend
    /// connection is handed out after cancellation.
    pub async fn dial(
        &self,
        tunnel_id: u64,
        cancel: &CancellationToken,
        events: &dyn RelayEvents,
    ) -> Result<TcpStream> {
        let mut backoff = Backoff::new(self.backoff_initial, self.backoff_max);

        loop {
            let attempt = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RelayError::Cancelled),
                attempt = self.connect_once() => attempt,
            };

            let error = match attempt {
                Ok(stream) => return Ok(stream),
                Err(e) => e,
            };

            let delay = backoff.next_delay();
            events.dial_retry(tunnel_id, &self.target, &error, delay);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RelayError::Cancelled),
                _ = sleep(delay) => {}
            }
        }
    }
}
