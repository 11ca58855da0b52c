//! Common module
//!
//! Shared errors, logging setup, network helpers and the buffer pool.

pub mod error;
pub mod log;
pub mod net;
pub mod buffer_pool;

// Re-export commonly used types and functions
pub use error::{RelayError, Result};
pub use log::init_logger;
pub use net::{parse_socket_addr, is_host_port};
pub use buffer_pool::{BufferPool, PooledBuffer};
