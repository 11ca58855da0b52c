//! Data forwarding module
//!
//! Relays bytes between the client and the backend in both directions.
//! Each direction runs in its own task and, on EOF or error from its source,
//! half-closes its destination so the peer sees end-of-stream while the
//! opposite direction keeps flowing. Once the first direction finishes, the
//! other gets a bounded linger period before it is cut off.

use log::{debug, error};
use std::fmt;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task::JoinError;
use tokio::time::timeout;

use crate::common::BufferPool;
use super::events::RelayEvents;
use super::tunnel::{Tunnel, TunnelState};

/// Direction of a copy task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Client to backend
    ClientToBackend,
    /// Backend to client
    BackendToClient,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientToBackend => write!(f, "client -> backend"),
            Self::BackendToClient => write!(f, "backend -> client"),
        }
    }
}

/// Outcome of forwarding one tunnel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardStats {
    /// Bytes written to the backend, `None` if that direction was cut off
    pub client_to_backend: Option<u64>,
    /// Bytes written to the client, `None` if that direction was cut off
    pub backend_to_client: Option<u64>,
    /// Direction that finished first
    pub first_finished: Direction,
    /// Whether the linger timer expired and forced the close
    pub forced: bool,
}

/// Forward data between client and backend until both directions finish
/// or the linger period after the first EOF runs out
///
/// Both streams are closed when this returns, on every path.
pub async fn forward(
    tunnel: &mut Tunnel,
    client: TcpStream,
    backend: TcpStream,
    pool: &BufferPool,
    linger: Duration,
    events: &dyn RelayEvents,
) -> ForwardStats {
    let (client_reader, client_writer) = client.into_split();
    let (backend_reader, backend_writer) = backend.into_split();

    let mut client_to_backend = tokio::spawn(copy_half(
        client_reader,
        backend_writer,
        pool.clone(),
    ));
    let mut backend_to_client = tokio::spawn(copy_half(
        backend_reader,
        client_writer,
        pool.clone(),
    ));

    let (first_finished, first_result) = tokio::select! {
        result = &mut client_to_backend => (Direction::ClientToBackend, result),
        result = &mut backend_to_client => (Direction::BackendToClient, result),
    };
    let first_bytes = joined_bytes(tunnel.id(), first_finished, first_result);

    tunnel.transition(TunnelState::Draining);
    debug!("[tunnel {}] {} finished first, lingering up to {:?}", tunnel.id(), first_finished, linger);

    let (remaining_direction, remaining) = match first_finished {
        Direction::ClientToBackend => (Direction::BackendToClient, &mut backend_to_client),
        Direction::BackendToClient => (Direction::ClientToBackend, &mut client_to_backend),
    };

    let (remaining_bytes, forced) = match timeout(linger, &mut *remaining).await {
        Ok(result) => (joined_bytes(tunnel.id(), remaining_direction, result), false),
        Err(_) => {
            events.forced_close(tunnel.id(), linger);
            // Aborting drops the task's socket halves and its buffer.
            remaining.abort();
            let _ = remaining.await;
            (None, true)
        }
    };

    let (client_to_backend, backend_to_client) = match first_finished {
        Direction::ClientToBackend => (first_bytes, remaining_bytes),
        Direction::BackendToClient => (remaining_bytes, first_bytes),
    };

    debug!(
        "[tunnel {}] forwarded {:?} bytes client -> backend, {:?} bytes backend -> client",
        tunnel.id(), client_to_backend, backend_to_client
    );

    ForwardStats {
        client_to_backend,
        backend_to_client,
        first_finished,
        forced,
    }
}

/// Copy from `reader` to `writer` until EOF or an error, then half-close
/// `writer`
///
/// Returns the number of bytes written. Errors end the copy the same way
/// EOF does; the relay has no framing that an early stop could corrupt.
async fn copy_half(
    mut reader: OwnedReadHalf,
    mut writer: OwnedWriteHalf,
    pool: BufferPool,
) -> u64 {
    let mut buffer = pool.get_buffer();
    let mut total: u64 = 0;

    loop {
        let n = match reader.read(&mut buffer).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!("read ended with error: {}", e);
                break;
            }
        };

        if let Err(e) = writer.write_all(&buffer[..n]).await {
            debug!("write ended with error: {}", e);
            break;
        }
        total += n as u64;
    }

    // Write-side shutdown only; the peer's reads see EOF, ours stay open.
    let _ = writer.shutdown().await;
    total
}

fn joined_bytes(tunnel_id: u64, direction: Direction, result: Result<u64, JoinError>) -> Option<u64> {
    match result {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            error!("[tunnel {}] {} copy task failed: {}", tunnel_id, direction, e);
            None
        }
    }
}
