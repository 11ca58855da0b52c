//! Active tunnel registry
//!
//! A shared counter of tunnels whose backend connection is established.
//! Tunnels enter through [`TunnelRegistry::enter`] and leave when the returned
//! guard is dropped, so every increment has exactly one matching decrement.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counter of active tunnels, cheap to clone
#[derive(Debug, Clone, Default)]
pub struct TunnelRegistry {
    active: Arc<AtomicUsize>,
}

/// Membership in the registry; decrements the count when dropped
#[derive(Debug)]
pub struct ActiveGuard {
    active: Arc<AtomicUsize>,
}

impl TunnelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a tunnel as active until the guard is dropped
    ///
    /// Returns the guard and the count including this tunnel.
    pub fn enter(&self) -> (ActiveGuard, usize) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        (ActiveGuard { active: Arc::clone(&self.active) }, now)
    }

    /// Number of active tunnels
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}
