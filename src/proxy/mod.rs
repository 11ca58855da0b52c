//! Relay engine
//!
//! Acceptance, resilient backend dialing, duplex forwarding with half-close
//! propagation, and shutdown draining.

pub mod dialer;
pub mod events;
pub mod forwarder;
pub mod handler;
pub mod registry;
pub mod server;
pub mod shutdown;
pub mod tunnel;

pub use dialer::{Backoff, Dialer};
pub use events::{LogEvents, RelayEvents};
pub use forwarder::{forward, Direction, ForwardStats};
pub use handler::{handle_connection, TunnelContext};
pub use registry::{ActiveGuard, TunnelRegistry};
pub use server::Relay;
pub use shutdown::{termination_signal, DrainOutcome, ShutdownCoordinator};
pub use tunnel::{Tunnel, TunnelState};
