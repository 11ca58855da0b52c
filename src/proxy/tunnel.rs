//! Tunnel bookkeeping
//!
//! A [`Tunnel`] describes one relay session; it owns no sockets. Its state
//! only moves forward:
//!
//! ```text
//! Dialing -> Active -> Draining -> Closed
//!    |                               ^
//!    +-------------------------------+   (cancelled before connect)
//! ```

use log::debug;
use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, SystemTime};

/// Lifecycle state of a tunnel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelState {
    /// Waiting for the backend connection
    Dialing,
    /// Both directions are forwarding
    Active,
    /// One direction finished; the other may still deliver in-flight bytes
    Draining,
    /// Both connections are closed
    Closed,
}

impl TunnelState {
    /// Whether `self -> next` is a legal transition
    pub fn can_transition_to(self, next: TunnelState) -> bool {
        use TunnelState::*;
        matches!(
            (self, next),
            (Dialing, Active) | (Dialing, Closed) | (Active, Draining) | (Active, Closed) | (Draining, Closed)
        )
    }
}

impl fmt::Display for TunnelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dialing => write!(f, "dialing"),
            Self::Active => write!(f, "active"),
            Self::Draining => write!(f, "draining"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// One relay session
#[derive(Debug, Clone)]
pub struct Tunnel {
    id: u64,
    client_addr: SocketAddr,
    created_at: SystemTime,
    state: TunnelState,
}

impl Tunnel {
    /// Create a tunnel for a freshly accepted client, in `Dialing`
    pub fn new(id: u64, client_addr: SocketAddr) -> Self {
        Self {
            id,
            client_addr,
            created_at: SystemTime::now(),
            state: TunnelState::Dialing,
        }
    }

    /// Tunnel id, unique within one relay
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Address of the client peer
    pub fn client_addr(&self) -> SocketAddr {
        self.client_addr
    }

    /// When the client connection was accepted
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Current state
    pub fn state(&self) -> TunnelState {
        self.state
    }

    /// Time since the client connection was accepted
    pub fn age(&self) -> Duration {
        SystemTime::now()
            .duration_since(self.created_at)
            .unwrap_or_default()
    }

    /// Move to `next`; illegal transitions are ignored and return `false`
    pub fn transition(&mut self, next: TunnelState) -> bool {
        if !self.state.can_transition_to(next) {
            debug!("[tunnel {}] ignoring transition {} -> {}", self.id, self.state, next);
            return false;
        }

        debug!("[tunnel {}] {} -> {}", self.id, self.state, next);
        self.state = next;
        true
    }
}
